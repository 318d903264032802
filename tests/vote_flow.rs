// Vote toggle flows over the directory-backed store

use std::env;
use std::fs;
use std::path::PathBuf;

use softcenter::catalog::Tutorial;
use softcenter::store::TutorialStore;
use softcenter::store::dir::DirStore;
use softcenter::votes::{VoteBox, VoteKind, VoteState};

fn temp_root(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(format!("softcenter-test-{}", name));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn seed_tutorial(store: &DirStore) -> String {
    let tutorial = Tutorial::new("VPN Setup", "connect to the campus network");
    store.save_tutorial(&tutorial).unwrap();
    tutorial.id
}

#[test]
fn test_vote_survives_reopen() {
    let root = temp_root("vote-reopen");
    let store = DirStore::open(&root).unwrap();
    let id = seed_tutorial(&store);

    {
        let mut vote = VoteBox::open(&store, &store, &id).unwrap();
        assert_eq!(vote.state(), VoteState::None);
        vote.click(VoteKind::Like).unwrap();
    }
    drop(store);

    let store = DirStore::open(&root).unwrap();
    let vote = VoteBox::open(&store, &store, &id).unwrap();
    assert_eq!(vote.state(), VoteState::Liked);
    assert_eq!(vote.likes(), 1);
    assert_eq!(vote.dislikes(), 0);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_switch_vote_after_reopen() {
    let root = temp_root("vote-switch");
    let store = DirStore::open(&root).unwrap();
    let id = seed_tutorial(&store);

    {
        let mut vote = VoteBox::open(&store, &store, &id).unwrap();
        vote.click(VoteKind::Like).unwrap();
    }
    drop(store);

    let store = DirStore::open(&root).unwrap();
    {
        let mut vote = VoteBox::open(&store, &store, &id).unwrap();
        assert_eq!(vote.state(), VoteState::Liked);
        vote.click(VoteKind::Dislike).unwrap();
        assert_eq!(vote.state(), VoteState::Disliked);
        assert_eq!(vote.likes(), 0);
        assert_eq!(vote.dislikes(), 1);
    }

    let stored = store.get_tutorial(&id).unwrap();
    assert_eq!(stored.likes, 0);
    assert_eq!(stored.dislikes, 1);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_unvote_removes_saved_choice() {
    let root = temp_root("vote-unvote");
    let store = DirStore::open(&root).unwrap();
    let id = seed_tutorial(&store);

    {
        let mut vote = VoteBox::open(&store, &store, &id).unwrap();
        vote.click(VoteKind::Like).unwrap();
        vote.click(VoteKind::Like).unwrap();
        assert_eq!(vote.state(), VoteState::None);
        assert_eq!(vote.likes(), 0);
    }
    drop(store);

    let store = DirStore::open(&root).unwrap();
    let vote = VoteBox::open(&store, &store, &id).unwrap();
    assert_eq!(vote.state(), VoteState::None);

    let settings = fs::read_to_string(root.join("settings.toml")).unwrap_or_default();
    assert!(!settings.contains("tutorial-vote"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn test_saved_choice_lands_in_settings_file() {
    let root = temp_root("vote-settings");
    let store = DirStore::open(&root).unwrap();
    let id = seed_tutorial(&store);

    let mut vote = VoteBox::open(&store, &store, &id).unwrap();
    vote.click(VoteKind::Like).unwrap();

    let settings = fs::read_to_string(root.join("settings.toml")).unwrap();
    assert!(settings.contains(&format!("tutorial-vote-{}", id)));
    assert!(settings.contains("like"));

    let _ = fs::remove_dir_all(&root);
}
