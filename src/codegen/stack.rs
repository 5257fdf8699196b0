//! Shadow model of the TVM operand stack.
//!
//! Every emitted instruction applies its net stack delta here, so the
//! model stays exactly in step with what the code will do at runtime.
//! Named declarations map to absolute positions; consumers address them
//! by offset from the top.

use std::collections::HashMap;

use crate::ast::DeclId;

#[derive(Clone, Debug, Default)]
pub struct StackModel {
    size: i32,
    /// Parameters and locals, by absolute stack position (0 = bottom).
    positions: HashMap<DeclId, i32>,
}

impl StackModel {
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn change(&mut self, diff: i32) {
        self.size += diff;
        assert!(self.size >= 0, "stack underflow in the shadow model");
    }

    pub fn is_param(&self, decl: DeclId) -> bool {
        self.positions.contains_key(&decl)
    }

    /// Bind `decl`. With `do_allocation` the declaration gets a fresh
    /// slot on top (growing the stack); without it, it aliases the value
    /// already on top; the initializer expression just pushed it.
    pub fn add(&mut self, decl: DeclId, do_allocation: bool) {
        assert!(
            !self.positions.contains_key(&decl),
            "declaration bound twice"
        );
        let position = if do_allocation {
            let p = self.size;
            self.size += 1;
            p
        } else {
            debug_assert!(self.size > 0, "no value on the stack to alias");
            self.size - 1
        };
        self.positions.insert(decl, position);
    }

    /// Offset of `decl` from the top of the stack.
    pub fn offset(&self, decl: DeclId) -> i32 {
        self.offset_of_position(self.position(decl))
    }

    pub fn offset_of_position(&self, position: i32) -> i32 {
        self.size - 1 - position
    }

    /// Absolute position `decl` was bound at.
    pub fn position(&self, decl: DeclId) -> i32 {
        match self.positions.get(&decl) {
            Some(&p) => p,
            None => panic!("declaration {:?} is not on the stack", decl),
        }
    }

    /// Synchronization point: abort if the model disagrees with what the
    /// calling compiler expects here.
    pub fn ensure_size(&self, expected: i32, location: &str) {
        assert!(
            expected == self.size,
            "stack: {} vs {} at {}",
            expected,
            self.size,
            location
        );
    }
}
