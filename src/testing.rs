//! Test fixtures shared by unit tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::object::{GroupVersionKind, ObjectMeta, Resource};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct WidgetSpec {
    #[serde(default)]
    pub(crate) size: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Widget {
    pub(crate) metadata: ObjectMeta,
    #[serde(default)]
    pub(crate) spec: WidgetSpec,
}

impl Resource for Widget {
    fn gvk() -> GroupVersionKind {
        GroupVersionKind::new("test.example.com", "v1", "Widget")
    }
    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }
    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

pub(crate) fn widget(namespace: &str, name: &str) -> Widget {
    Widget {
        metadata: ObjectMeta::named(name).in_namespace(namespace),
        spec: WidgetSpec { size: 1 },
    }
}

pub(crate) fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
