use crate::slot::KeySlot;
use serde::{Serialize, de::DeserializeOwned};

///
/// Entity
///
/// A storable record of one kind: a key slot plus any number of other
/// fields, some of which may themselves hold key slots pointing at
/// other entities. The explicit slot accessors replace reflective
/// field walking; create-time resolution visits exactly what
/// `reference_slots` exposes.
///
/// Implement via [`entity_kind!`](crate::entity_kind) rather than by
/// hand.
///

pub trait Entity: Clone + Serialize + DeserializeOwned + 'static {
    const KIND: &'static str;

    /// The entity's own key slot.
    fn key(&self) -> &KeySlot;

    /// Mutable access for create-time key swapping.
    fn key_mut(&mut self) -> &mut KeySlot;

    /// Every key-valued field referencing another entity. The entity's
    /// own key is not included.
    fn reference_slots(&mut self) -> Vec<&mut KeySlot> {
        Vec::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use crate::{key::Key, slot::KeySlot};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Deserialize, Serialize)]
    struct Post {
        key: KeySlot,
        title: String,
        author: KeySlot,
        editor: Option<KeySlot>,
    }

    entity_kind!(
        Post,
        kind = "Post",
        key = key,
        references = [author],
        optional_references = [editor],
    );

    fn post(editor: Option<KeySlot>) -> Post {
        Post {
            key: Key::try_new("Post", 1).unwrap().into(),
            title: "hello".to_string(),
            author: Key::try_new("User", 1).unwrap().into(),
            editor,
        }
    }

    #[test]
    fn reference_slots_exclude_the_own_key() {
        use crate::entity::Entity;

        let mut entity = post(None);
        let slots = entity.reference_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(*slots[0], Key::try_new("User", 1).unwrap());
    }

    #[test]
    fn optional_reference_slots_are_walked_when_present() {
        use crate::entity::Entity;

        let editor = KeySlot::from(Key::try_new("User", 9).unwrap());
        let mut entity = post(Some(editor));
        assert_eq!(entity.reference_slots().len(), 2);
    }

    #[test]
    fn entity_round_trips_through_serde() {
        use crate::entity::Entity;

        let entity = post(None);
        let json = serde_json::to_string(&entity).unwrap();
        let back: Post = serde_json::from_str(&json).unwrap();

        assert_eq!(back.key(), entity.key());
        assert_eq!(back.title, "hello");
    }
}
