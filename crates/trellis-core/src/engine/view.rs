use serde_json::{Map, Value};

use crate::permission::PermissionSet;
use crate::resource::ResourceKey;
use crate::subject::AuthorizationContext;

use super::Enforcer;

impl Enforcer {
    /// Restricts a JSON document rooted at `key` to what the context may see.
    ///
    /// Object fields map to child paths. A field is kept whole when its
    /// subtree is unrestricted, filtered recursively when only part of it is
    /// visible, and dropped otherwise. Field names that are not valid path
    /// segments are dropped.
    pub fn build_json_view(
        &self,
        key: &ResourceKey,
        value: &Value,
        permissions: &PermissionSet,
        context: &AuthorizationContext,
    ) -> Option<Value> {
        let Value::Object(fields) = value else {
            return self
                .has_permission(key, permissions, context)
                .then(|| value.clone());
        };

        if self.has_permissions_on_resource(key, permissions, context) {
            return Some(value.clone());
        }
        if !self.has_permissions_on_resource_or_any_subresource(key, permissions, context) {
            return None;
        }

        let mut visible = Map::new();
        for (field, child) in fields {
            let Ok(child_key) = key.child(field.as_str()) else {
                continue;
            };
            if let Some(child_view) = self.build_json_view(&child_key, child, permissions, context) {
                visible.insert(field.clone(), child_view);
            }
        }

        if visible.is_empty() && !self.has_permission(key, permissions, context) {
            None
        } else {
            Some(Value::Object(visible))
        }
    }
}
