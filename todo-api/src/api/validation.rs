//! Input checks for todo request bodies.
//!
//! Bodies go through two stages. [`check_necessary_parameter`] enforces the
//! shape of the request and fails with a single error; [`validate_fields`]
//! then checks each field and reports every problem at once.

use serde_json::{Map, Value};
use todo_core::{TITLE_MAX_LENGTH, TodoFields};

use super::error::{ApiError, FieldErrors, Result};

const TITLE: &str = "title";
const CONTENT: &str = "content";
const IS_COMPLETED: &str = "is_completed";

const NULL_MESSAGE: &str = "This field may not be null.";
const BLANK_MESSAGE: &str = "This field may not be blank.";
const NOT_A_STRING_MESSAGE: &str = "Not a valid string.";
const REQUIRED_MESSAGE: &str = "This field is required.";

/// Parses and validates a create/update body into the writable fields of a todo.
pub fn parse_todo_fields(body: &[u8]) -> Result<TodoFields> {
    let data = parse_body(body)?;
    let data = check_necessary_parameter(data)?;
    validate_fields(&data)
}

/// An empty body is treated as an empty object.
pub fn parse_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    serde_json::from_slice(body).map_err(ApiError::Parse)
}

/// Drops the completion flag and checks that `title` and `content` are present and non-empty.
///
/// The first failing check decides the error.
pub fn check_necessary_parameter(data: Value) -> Result<Map<String, Value>> {
    let Value::Object(mut data) = data else {
        return Err(ApiError::BadRequestFormat);
    };

    data.remove(IS_COMPLETED);

    if !data.contains_key(TITLE) || !data.contains_key(CONTENT) {
        return Err(ApiError::BadRequestFormat);
    }

    if data[TITLE] == "" {
        return Err(ApiError::EmptyTitle);
    }

    if data[CONTENT] == "" {
        return Err(ApiError::EmptyContent);
    }

    Ok(data)
}

/// Field-level checks, collecting the messages of every field that fails.
pub fn validate_fields(data: &Map<String, Value>) -> Result<TodoFields> {
    let mut errors = FieldErrors::new();

    let title = char_field(data, TITLE, Some(TITLE_MAX_LENGTH), &mut errors);
    let content = char_field(data, CONTENT, None, &mut errors);

    match (title, content) {
        (Some(title), Some(content)) => Ok(TodoFields { title, content }),
        _ => Err(ApiError::Invalid(errors)),
    }
}

fn char_field(
    data: &Map<String, Value>,
    name: &'static str,
    max_length: Option<usize>,
    errors: &mut FieldErrors,
) -> Option<String> {
    let value = match data.get(name) {
        Some(Value::String(value)) => value.trim().to_owned(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Null) => return reject(errors, name, NULL_MESSAGE.to_owned()),
        Some(_) => return reject(errors, name, NOT_A_STRING_MESSAGE.to_owned()),
        None => return reject(errors, name, REQUIRED_MESSAGE.to_owned()),
    };

    if value.is_empty() {
        return reject(errors, name, BLANK_MESSAGE.to_owned());
    }

    if let Some(max_length) = max_length {
        if value.chars().count() > max_length {
            return reject(
                errors,
                name,
                format!("Ensure this field has no more than {max_length} characters."),
            );
        }
    }

    Some(value)
}

fn reject(errors: &mut FieldErrors, name: &'static str, message: String) -> Option<String> {
    errors.entry(name).or_default().push(message);
    None
}
