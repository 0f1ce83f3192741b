//! Per-node bit flags (spec.md 3.2).

bitflags::bitflags! {
    #[derive(Default)]
    pub struct NodeFlags: u8 {
        /// Every child is `Constant` (for compound nodes) and the node's own
        /// semantics admit compile-time evaluation.
        const CONSTANT = 0b0001;
        /// This node's value is produced as the enclosing function's return
        /// value (see [`crate::ast::mark_tail`]).
        const TAIL = 0b0010;
        /// This node is lexically inside a `try` protected region.
        const IN_TRY = 0b0100;
        /// This node's slot may not be written to outside its initializing
        /// assignment.
        const READ_ONLY = 0b1000;
    }
}
