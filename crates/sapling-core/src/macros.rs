///
/// entity_kind
///
/// Implements [`Entity`](crate::entity::Entity) for a struct: names the
/// kind, wires the key field, and lists the key-valued reference
/// fields create-time resolution must walk. `references` fields are
/// `KeySlot`; `optional_references` fields are `Option<KeySlot>`.
///
/// ```ignore
/// entity_kind!(Post, kind = "Post", key = key, references = [author]);
/// ```
///
#[macro_export]
macro_rules! entity_kind {
    (
        $entity:ty,
        kind = $kind:literal,
        key = $key:ident
        $(, references = [ $( $ref_field:ident ),* $(,)? ] )?
        $(, optional_references = [ $( $opt_field:ident ),* $(,)? ] )?
        $(,)?
    ) => {
        impl $crate::entity::Entity for $entity {
            const KIND: &'static str = $kind;

            fn key(&self) -> &$crate::slot::KeySlot {
                &self.$key
            }

            fn key_mut(&mut self) -> &mut $crate::slot::KeySlot {
                &mut self.$key
            }

            fn reference_slots(&mut self) -> Vec<&mut $crate::slot::KeySlot> {
                let mut slots: Vec<&mut $crate::slot::KeySlot> = Vec::new();
                $( $( slots.push(&mut self.$ref_field); )* )?
                $( $( slots.extend(self.$opt_field.as_mut()); )* )?
                slots
            }
        }
    };
}
