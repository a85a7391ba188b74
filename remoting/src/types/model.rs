//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Remotable, TypeDescription, TypeRef};

/// Memoising registry of type descriptions.
///
/// A `TypeModel` is shared by every serializer that should agree on the same
/// descriptions. It is cheap to query concurrently: lookups take a read lock
/// and descriptions are built outside of any lock.
#[derive(Default)]
pub struct TypeModel {
    by_id: RwLock<HashMap<TypeId, Arc<TypeDescription>>>,
    by_name: RwLock<HashMap<String, TypeId>>,
}

impl TypeModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the description of `T`, building it on first use.
    pub fn describe<T: Remotable>(&self) -> Arc<TypeDescription> {
        self.describe_ref(TypeRef::of::<T>())
    }

    /// Returns the description behind `type_ref`, building it on first use.
    pub fn describe_ref(&self, type_ref: TypeRef) -> Arc<TypeDescription> {
        if let Some(description) = self.by_id.read().get(&type_ref.type_id()) {
            return Arc::clone(description);
        }
        let built = Arc::new(type_ref.describe());
        let description = Arc::clone(
            self.by_id
                .write()
                .entry(type_ref.type_id())
                .or_insert(built),
        );
        self.by_name
            .write()
            .entry(description.name().to_string())
            .or_insert(type_ref.type_id());
        description
    }

    /// Returns an already built description.
    pub fn get(&self, type_id: TypeId) -> Option<Arc<TypeDescription>> {
        self.by_id.read().get(&type_id).cloned()
    }

    /// Finds an already built description by its type name.
    pub fn find(&self, name: &str) -> Option<Arc<TypeDescription>> {
        let type_id = *self.by_name.read().get(name)?;
        self.get(type_id)
    }

    /// Number of described types.
    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    /// Whether nothing has been described yet.
    pub fn is_empty(&self) -> bool {
        self.by_id.read().is_empty()
    }
}

impl fmt::Debug for TypeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeModel")
            .field("types", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SerializationKind;

    #[test]
    fn test_describe_is_memoised() {
        let model = TypeModel::new();
        let first = model.describe::<i32>();
        let second = model.describe::<i32>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_find_by_name() {
        let model = TypeModel::new();
        assert!(model.find("String").is_none());
        model.describe::<String>();
        let description = model.find("String").map(|d| d.kind());
        assert_eq!(description, Some(SerializationKind::DataContract));
    }
}
