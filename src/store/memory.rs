// In-memory backend for tests, demos and seeding
// Failure injection flags let tests drive the error paths

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::catalog::{Category, Software, Tutorial};
use crate::stats::UsageEvent;
use crate::store::{
    KeyValueStore, ObjectStorage, SoftwareStore, StoreError, StoreResult, TutorialStore, UsageLog,
};
use crate::votes::VoteDelta;

#[derive(Default)]
pub struct MemoryStore {
    tutorials: RefCell<HashMap<String, Tutorial>>,
    software: RefCell<HashMap<String, Software>>,
    tutorial_categories: RefCell<Vec<Category>>,
    software_categories: RefCell<Vec<Category>>,
    objects: RefCell<HashMap<(String, String), Vec<u8>>>,
    values: RefCell<HashMap<String, String>>,
    events: RefCell<Vec<UsageEvent>>,
    fail_saves: Cell<bool>,
    fail_vote_updates: Cell<bool>,
    fail_uploads: Cell<bool>,
    fail_events: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make record saves fail until reset
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// Make counter updates fail until reset
    pub fn fail_vote_updates(&self, fail: bool) {
        self.fail_vote_updates.set(fail);
    }

    /// Make object uploads fail until reset
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.set(fail);
    }

    /// Make event inserts fail until reset
    pub fn fail_events(&self, fail: bool) {
        self.fail_events.set(fail);
    }

    /// Stored bytes for an object, if present
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .borrow()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Number of objects stored in a bucket
    pub fn object_count(&self, bucket: &str) -> usize {
        self.objects
            .borrow()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }
}

impl TutorialStore for MemoryStore {
    fn list_tutorials(&self) -> StoreResult<Vec<Tutorial>> {
        let mut items: Vec<Tutorial> = self.tutorials.borrow().values().cloned().collect();
        items.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(items)
    }

    fn get_tutorial(&self, id: &str) -> StoreResult<Tutorial> {
        self.tutorials
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tutorial '{}'", id)))
    }

    fn save_tutorial(&self, tutorial: &Tutorial) -> StoreResult<()> {
        if self.fail_saves.get() {
            return Err(StoreError::Backend("save rejected".to_string()));
        }
        self.tutorials
            .borrow_mut()
            .insert(tutorial.id.clone(), tutorial.clone());
        Ok(())
    }

    fn delete_tutorial(&self, id: &str) -> StoreResult<()> {
        self.tutorials
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tutorial '{}'", id)))
    }

    fn apply_vote_delta(&self, id: &str, delta: VoteDelta) -> StoreResult<Tutorial> {
        if self.fail_vote_updates.get() {
            return Err(StoreError::Backend("vote update rejected".to_string()));
        }
        let mut tutorials = self.tutorials.borrow_mut();
        let tutorial = tutorials
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("tutorial '{}'", id)))?;
        (tutorial.likes, tutorial.dislikes) = delta.apply(tutorial.likes, tutorial.dislikes);
        Ok(tutorial.clone())
    }

    fn list_tutorial_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.tutorial_categories.borrow().clone())
    }

    fn save_tutorial_category(&self, category: &Category) -> StoreResult<()> {
        upsert_category(&mut self.tutorial_categories.borrow_mut(), category);
        Ok(())
    }
}

impl SoftwareStore for MemoryStore {
    fn list_software(&self) -> StoreResult<Vec<Software>> {
        let mut items: Vec<Software> = self.software.borrow().values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn get_software(&self, id: &str) -> StoreResult<Software> {
        self.software
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("software '{}'", id)))
    }

    fn save_software(&self, software: &Software) -> StoreResult<()> {
        if self.fail_saves.get() {
            return Err(StoreError::Backend("save rejected".to_string()));
        }
        self.software
            .borrow_mut()
            .insert(software.id.clone(), software.clone());
        Ok(())
    }

    fn delete_software(&self, id: &str) -> StoreResult<()> {
        self.software
            .borrow_mut()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("software '{}'", id)))
    }

    fn list_software_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.software_categories.borrow().clone())
    }

    fn save_software_category(&self, category: &Category) -> StoreResult<()> {
        upsert_category(&mut self.software_categories.borrow_mut(), category);
        Ok(())
    }
}

impl ObjectStorage for MemoryStore {
    fn upload(&self, bucket: &str, key: &str, bytes: &[u8]) -> StoreResult<()> {
        if self.fail_uploads.get() {
            return Err(StoreError::Backend("upload rejected".to_string()));
        }
        self.objects
            .borrow_mut()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }

    fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.objects
            .borrow_mut()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

impl UsageLog for MemoryStore {
    fn record(&self, event: UsageEvent) -> StoreResult<()> {
        if self.fail_events.get() {
            return Err(StoreError::Backend("event insert rejected".to_string()));
        }
        self.events.borrow_mut().push(event);
        Ok(())
    }

    fn events(&self) -> StoreResult<Vec<UsageEvent>> {
        Ok(self.events.borrow().clone())
    }
}

fn upsert_category(categories: &mut Vec<Category>, category: &Category) {
    match categories.iter_mut().find(|c| c.id == category.id) {
        Some(existing) => *existing = category.clone(),
        None => categories.push(category.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SoftwareDraft;

    #[test]
    fn test_tutorial_round_trip() {
        let store = MemoryStore::new();
        let tutorial = Tutorial::new("VPN Setup", "some content");

        store.save_tutorial(&tutorial).unwrap();
        let loaded = store.get_tutorial(&tutorial.id).unwrap();
        assert_eq!(loaded, tutorial);

        store.delete_tutorial(&tutorial.id).unwrap();
        assert!(store.get_tutorial(&tutorial.id).is_err());
    }

    #[test]
    fn test_software_round_trip() {
        let store = MemoryStore::new();
        let software = Software::create(SoftwareDraft {
            name: "GIMP".to_string(),
            ..Default::default()
        });

        store.save_software(&software).unwrap();
        let loaded = store.get_software(&software.id).unwrap();
        assert_eq!(loaded, software);

        store.delete_software(&software.id).unwrap();
        assert!(store.get_software(&software.id).unwrap_err().is_not_found());
        assert!(
            store
                .delete_software(&software.id)
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_tutorial("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_save_is_upsert() {
        let store = MemoryStore::new();
        let mut tutorial = Tutorial::new("Draft", "v1");
        store.save_tutorial(&tutorial).unwrap();

        tutorial.content = "v2".to_string();
        store.save_tutorial(&tutorial).unwrap();

        assert_eq!(store.get_tutorial(&tutorial.id).unwrap().content, "v2");
        assert_eq!(store.list_tutorials().unwrap().len(), 1);
    }

    #[test]
    fn test_lists_are_sorted_by_name() {
        let store = MemoryStore::new();
        store.save_tutorial(&Tutorial::new("Zsh", "")).unwrap();
        store.save_tutorial(&Tutorial::new("Bash", "")).unwrap();

        let titles: Vec<String> = store
            .list_tutorials()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["Bash", "Zsh"]);
    }

    #[test]
    fn test_vote_delta_clamps_at_zero() {
        let store = MemoryStore::new();
        let tutorial = Tutorial::new("t", "");
        store.save_tutorial(&tutorial).unwrap();

        let updated = store
            .apply_vote_delta(
                &tutorial.id,
                VoteDelta {
                    likes: -1,
                    dislikes: 0,
                },
            )
            .unwrap();
        assert_eq!(updated.likes, 0);
    }

    #[test]
    fn test_object_storage_round_trip() {
        let store = MemoryStore::new();
        store.upload("tutorial-images", "123-pic.png", b"bytes").unwrap();

        assert_eq!(
            store.object("tutorial-images", "123-pic.png").as_deref(),
            Some(b"bytes".as_slice())
        );
        assert_eq!(
            store.public_url("tutorial-images", "123-pic.png"),
            "memory://tutorial-images/123-pic.png"
        );

        store.delete("tutorial-images", "123-pic.png").unwrap();
        assert!(store.object("tutorial-images", "123-pic.png").is_none());
        // Deleting again stays quiet
        store.delete("tutorial-images", "123-pic.png").unwrap();
    }

    #[test]
    fn test_category_upsert() {
        let store = MemoryStore::new();
        let mut category = Category::new("Networking");
        store.save_tutorial_category(&category).unwrap();

        category.name = "Network".to_string();
        store.save_tutorial_category(&category).unwrap();

        let categories = store.list_tutorial_categories().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Network");
    }

    #[test]
    fn test_events_are_appended() {
        let store = MemoryStore::new();
        store.record(UsageEvent::page_view("home")).unwrap();
        store.record(UsageEvent::page_view("apps")).unwrap();

        let events = store.events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].subject, "home");
    }
}
