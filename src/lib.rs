//! A WebAssembly MVP bytecode interpreter written in Rust.
//!
//! wasmite executes linear bytecode with WebAssembly 1.0 MVP semantics. It
//! consumes an already-parsed module description (decoded signatures, raw
//! code bytes, locals declarations, evaluated global initializers,
//! memory/table limits, data and element segments, exports), instantiates a
//! runtime image, and runs an exported function on a stack machine with
//! pre-indexed structured control flow.
//!
//! # Modules
//!
//! - [`module`] -- The typed module description the engine consumes.
//! - [`opcode`] -- Opcode byte constants and mnemonics.
//! - [`reader`] -- Bounded byte cursor: LEB128 and raw little-endian reads.
//! - [`runtime`] -- Interpreter: operand/call stacks, control pre-indexing,
//!   memory, tables, and the dispatcher.
//! - [`driver`] -- Argument marshaling and result printing for `main`.
//!
//! # Example
//!
//! Build a module description for `main(i32) -> i32` that returns its
//! argument, instantiate it, and call it:
//!
//! ```
//! use wasmite::module::{Export, ExportKind, Function, FunctionType, Module, ValueType};
//! use wasmite::runtime::{Instance, Value};
//!
//! let module = Module {
//!     types: vec![FunctionType {
//!         params: vec![ValueType::I32],
//!         results: vec![ValueType::I32],
//!     }],
//!     functions: vec![Function {
//!         type_index: 0,
//!         locals: vec![],
//!         code: vec![0x20, 0x00, 0x0B], // local.get 0; end
//!     }],
//!     exports: vec![Export {
//!         name: "main".to_string(),
//!         kind: ExportKind::Function,
//!         index: 0,
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut instance = Instance::new(&module).unwrap();
//! let results = instance.invoke("main", vec![Value::I32(42)]).unwrap();
//! assert_eq!(results, vec![Value::I32(42)]);
//! ```

pub mod driver;
pub mod logging;
pub mod module;
pub mod opcode;
pub mod reader;
pub mod runtime;
