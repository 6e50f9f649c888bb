/// Binding encoder - keeps one argument table per shader stage in sync
/// with the resources the frame needs.
///
/// Every `encode` call first serializes the requested bindings into a
/// canonical byte form (sorted by slot). When the bytes match what the
/// stage's table already holds, nothing is written; encoding the same
/// bindings twice is a no-op and always yields identical bytes.
///
/// ```text
/// per binding:  slot u32 LE | kind u8 | handle u64 LE
/// ```

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::graphics_device::{
    ArgumentTable, ArgumentTableDesc, BindingKind, BindingResource, GraphicsDevice, ShaderStage,
    validate_bindings,
};
use crate::engine_trace;

struct EncodedTable {
    table: Arc<dyn ArgumentTable>,
    bytes: Vec<u8>,
}

#[derive(Default)]
pub struct BindingEncoder {
    tables: FxHashMap<ShaderStage, EncodedTable>,
    encode_count: u64,
}

fn kind_tag(kind: BindingKind) -> u8 {
    match kind {
        BindingKind::UniformBuffer => 0,
        BindingKind::StorageBuffer => 1,
        BindingKind::SampledTexture => 2,
    }
}

/// Canonical encoding of a binding set
pub fn canonical_bytes(bindings: &[(u32, BindingResource)]) -> Vec<u8> {
    let mut sorted: Vec<&(u32, BindingResource)> = bindings.iter().collect();
    sorted.sort_by_key(|(slot, _)| *slot);

    let mut bytes = Vec::with_capacity(sorted.len() * 13);
    for (slot, resource) in sorted {
        bytes.extend_from_slice(&slot.to_le_bytes());
        bytes.push(kind_tag(resource.kind()));
        bytes.extend_from_slice(&resource.handle().to_le_bytes());
    }
    bytes
}

impl BindingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `bindings` into the table for `desc.stage`
    ///
    /// The table is created on first use and recreated when `desc` changes.
    /// Returns `true` when the table was written.
    ///
    /// # Arguments
    ///
    /// * `device` - Device owning the table
    /// * `desc` - Layout of the stage's table
    /// * `bindings` - `(slot, resource)` pairs; order does not matter
    pub fn encode(
        &mut self,
        device: &mut dyn GraphicsDevice,
        desc: &ArgumentTableDesc,
        bindings: &[(u32, BindingResource)],
    ) -> Result<bool> {
        validate_bindings(desc, bindings)?;
        let bytes = canonical_bytes(bindings);

        if let Some(current) = self.tables.get(&desc.stage) {
            if current.table.desc() == desc && current.bytes == bytes {
                return Ok(false);
            }
        }

        let table = match self.tables.remove(&desc.stage) {
            Some(current) if current.table.desc() == desc => current.table,
            _ => device.create_argument_table(desc.clone())?,
        };

        table.write(bindings)?;
        self.encode_count += 1;
        engine_trace!(
            "dank::BindingEncoder",
            "Encoded {:?} table: {} bindings",
            desc.stage,
            bindings.len()
        );

        self.tables.insert(desc.stage, EncodedTable { table, bytes });
        Ok(true)
    }

    /// Table currently holding `stage`'s bindings
    pub fn table(&self, stage: ShaderStage) -> Option<&Arc<dyn ArgumentTable>> {
        self.tables.get(&stage).map(|encoded| &encoded.table)
    }

    /// Canonical bytes of the last encode for `stage`
    pub fn encoded_bytes(&self, stage: ShaderStage) -> Option<&[u8]> {
        self.tables.get(&stage).map(|encoded| encoded.bytes.as_slice())
    }

    /// Number of table writes so far
    pub fn encode_count(&self) -> u64 {
        self.encode_count
    }

    /// Drop every table
    pub fn release(&mut self) {
        self.tables.clear();
    }
}

#[cfg(test)]
#[path = "binding_encoder_tests.rs"]
mod tests;
