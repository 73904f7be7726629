mod db;
mod models;

pub use db::Database;
pub use models::{TITLE_MAX_LENGTH, Todo, TodoFields};
