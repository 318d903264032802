pub mod commands;
pub mod markdown;

pub mod structured_document;
pub mod structured_editor;
