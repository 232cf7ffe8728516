//! Read-only document views
//!
//! A `ReadOnlyView` owns its own deep copy of a document and only hands
//! out shared references into it, so nothing reachable through the view can
//! be modified. Lookups into it return `ViewRef`s, borrowed views with the
//! same accessors. Attempts to write do not compile:
//!
//! ```compile_fail
//! use docstore::ReadOnlyView;
//! use serde_json::json;
//!
//! let view = ReadOnlyView::new(json!({"user": {"name": "ada"}}));
//! view["user"]["name"] = json!("eve");
//! ```

use serde_json::Value;
use std::ops::Deref;

#[derive(Debug, Clone, PartialEq)]
pub struct ReadOnlyView {
    value: Value,
}

/// View of a value nested inside a [`ReadOnlyView`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRef<'a> {
    value: &'a Value,
}

impl ReadOnlyView {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    #[must_use]
    pub fn as_view(&self) -> ViewRef<'_> {
        ViewRef::new(&self.value)
    }

    /// Member of an object
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ViewRef<'_>> {
        self.as_view().get(key)
    }

    /// Element of an array
    #[must_use]
    pub fn at(&self, index: usize) -> Option<ViewRef<'_>> {
        self.as_view().at(index)
    }

    /// JSON pointer lookup (`/users/0/name`)
    #[must_use]
    pub fn pointer(&self, path: &str) -> Option<ViewRef<'_>> {
        self.as_view().pointer(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.as_view().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_view().is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.as_view().keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = ViewRef<'_>> + '_ {
        self.as_view().iter()
    }

    /// Independent copy, free to mutate
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.value.clone()
    }
}

impl<'a> ViewRef<'a> {
    fn new(value: &'a Value) -> Self {
        Self { value }
    }

    #[must_use]
    pub fn get(self, key: &str) -> Option<ViewRef<'a>> {
        self.value.get(key).map(ViewRef::new)
    }

    #[must_use]
    pub fn at(self, index: usize) -> Option<ViewRef<'a>> {
        self.value.get(index).map(ViewRef::new)
    }

    #[must_use]
    pub fn pointer(self, path: &str) -> Option<ViewRef<'a>> {
        self.value.pointer(path).map(ViewRef::new)
    }

    /// Array items or object members; 0 for scalars
    #[must_use]
    pub fn len(self) -> usize {
        match self.value {
            Value::Array(items) => items.len(),
            Value::Object(members) => members.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Member names of an object; nothing for other values
    pub fn keys(self) -> impl Iterator<Item = &'a str> {
        self.value
            .as_object()
            .into_iter()
            .flat_map(|members| members.keys().map(String::as_str))
    }

    /// Items of an array; nothing for other values
    pub fn iter(self) -> impl Iterator<Item = ViewRef<'a>> {
        self.value.as_array().into_iter().flatten().map(ViewRef::new)
    }

    #[must_use]
    pub fn to_value(self) -> Value {
        self.value.clone()
    }
}

impl Deref for ReadOnlyView {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.value
    }
}

impl Deref for ViewRef<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        self.value
    }
}

impl AsRef<Value> for ReadOnlyView {
    fn as_ref(&self) -> &Value {
        &self.value
    }
}

impl PartialEq<Value> for ReadOnlyView {
    fn eq(&self, other: &Value) -> bool {
        &self.value == other
    }
}

impl PartialEq<Value> for ViewRef<'_> {
    fn eq(&self, other: &Value) -> bool {
        self.value == other
    }
}
