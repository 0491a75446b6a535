//! Typed WebAssembly module description
//!
//! This is the input interface of the engine: the already-parsed shape of a
//! module, with decoded signatures, raw code bytes, locals declarations,
//! evaluated global initializers, memory/table limits, data and element
//! segments, and exports. Binary section parsing is an external concern; the
//! CLI front-end loads this description from its serde form, in which code
//! bytes and data payloads are base64 strings.

use crate::runtime::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// WebAssembly value types supported by the MVP engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Function signature: ordered parameter and result kinds
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionType {
    #[serde(default)]
    pub params: Vec<ValueType>,
    #[serde(default)]
    pub results: Vec<ValueType>,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> (")?;
        for (i, r) in self.results.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, ")")
    }
}

/// A run of locals of one type, as declared in a function body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalGroup {
    pub count: u32,
    pub value_type: ValueType,
}

/// A function definition: signature reference, locals, and raw code bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub type_index: u32,
    #[serde(default)]
    pub locals: Vec<LocalGroup>,
    #[serde(with = "base64_bytes")]
    pub code: Vec<u8>,
}

impl Function {
    /// Total number of declared locals beyond the parameters
    pub fn local_count(&self) -> usize {
        self.locals.iter().map(|g| g.count as usize).sum()
    }
}

/// Linear memory limits. Growth is unsupported, so only the initial size
/// matters to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryType {
    pub initial_pages: u32,
}

/// Table limits, as above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TableType {
    pub initial_size: u32,
}

/// A global with its already-evaluated initial value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Global {
    pub value_type: ValueType,
    #[serde(default)]
    pub mutable: bool,
    pub init: Value,
}

/// An active data segment copied into linear memory at instantiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSegment {
    pub offset: u32,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

/// An active element segment written into a table at instantiation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSegment {
    #[serde(default)]
    pub table_index: u32,
    pub offset: u32,
    pub func_indices: Vec<u32>,
}

/// Kind of an exported entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Function,
    Table,
    Memory,
    Global,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub index: u32,
}

/// The complete module description consumed by the engine
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    #[serde(default)]
    pub types: Vec<FunctionType>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub memories: Vec<MemoryType>,
    #[serde(default)]
    pub tables: Vec<TableType>,
    /// Number of imported tables preceding the locally defined ones in the
    /// table index space. Indirect calls into imported tables trap.
    #[serde(default)]
    pub imported_tables: u32,
    #[serde(default)]
    pub globals: Vec<Global>,
    #[serde(default)]
    pub data: Vec<DataSegment>,
    #[serde(default)]
    pub elements: Vec<ElementSegment>,
    #[serde(default)]
    pub exports: Vec<Export>,
}

impl Module {
    /// Signature of the function at `func_idx`, if both indices resolve
    pub fn signature(&self, func_idx: u32) -> Option<&FunctionType> {
        let func = self.functions.get(func_idx as usize)?;
        self.types.get(func.type_index as usize)
    }

    /// Look up an export of the given kind by name
    pub fn find_export(&self, name: &str, kind: ExportKind) -> Option<&Export> {
        self.exports.iter().find(|e| e.kind == kind && e.name == name)
    }

    /// Initial page count of the first locally defined memory, zero if none
    pub fn initial_memory_pages(&self) -> u32 {
        self.memories.first().map(|m| m.initial_pages).unwrap_or(0)
    }
}

impl fmt::Display for Module {
    /// Human-readable summary, used by the CLI `--dump` flag
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module:")?;
        writeln!(f, "  types: {}", self.types.len())?;
        for (i, t) in self.types.iter().enumerate() {
            writeln!(f, "    [{i}] {t}")?;
        }
        writeln!(f, "  functions: {}", self.functions.len())?;
        for (i, func) in self.functions.iter().enumerate() {
            writeln!(
                f,
                "    [{i}] type {} locals {} code {} bytes",
                func.type_index,
                func.local_count(),
                func.code.len()
            )?;
        }
        writeln!(f, "  memories: {}", self.memories.len())?;
        for m in &self.memories {
            writeln!(f, "    {} pages", m.initial_pages)?;
        }
        writeln!(f, "  tables: {}", self.tables.len())?;
        writeln!(f, "  globals: {}", self.globals.len())?;
        writeln!(f, "  data segments: {}", self.data.len())?;
        writeln!(f, "  element segments: {}", self.elements.len())?;
        writeln!(f, "  exports: {}", self.exports.len())?;
        for e in &self.exports {
            writeln!(f, "    {:?} {} -> {}", e.kind, e.name, e.index)?;
        }
        Ok(())
    }
}

/// Byte payloads serialize as base64 strings so module files stay compact
/// and diff-friendly.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
