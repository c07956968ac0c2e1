//! MP2 block. Every key of `settings.mp2` goes through the passthrough
//! rules; nothing is interpreted here.

use crate::config::TaskDescriptor;
use crate::keywords::{emit_passthrough, ModuleBlock};

/// Builds the MP2 block. `mp2: true` or an empty mapping gives an empty block.
pub fn generate(descriptor: &TaskDescriptor) -> ModuleBlock {
    let mut block = ModuleBlock::new("MP2");
    emit_passthrough(&mut block, descriptor.settings.section("mp2"), &[]);
    block
}
