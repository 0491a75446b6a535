//! WebAssembly module instance
//!
//! An instance pairs a module description with its materialised runtime
//! image and an export map. It is created fresh per run; re-running a module
//! means building a new instance, which re-zeroes memory, re-applies data
//! and element segments, and re-initialises globals.

use super::{Executor, RuntimeError, Value};
use crate::module::{ExportKind, FunctionType, Module};
use std::collections::HashMap;
use tracing::debug;

/// A runtime instance of one module
pub struct Instance<'a> {
    module: &'a Module,
    /// Maps export name to function index
    exports: HashMap<String, u32>,
    executor: Executor<'a>,
}

impl<'a> Instance<'a> {
    /// Instantiate the module: allocate and fill memory and tables,
    /// initialise globals, and index the function exports.
    pub fn new(module: &'a Module) -> Result<Self, RuntimeError> {
        let executor = Executor::new(module)?;

        let mut exports = HashMap::new();
        for export in &module.exports {
            if export.kind == ExportKind::Function {
                exports.insert(export.name.clone(), export.index);
            }
        }

        debug!(
            functions = module.functions.len(),
            memory_pages = module.initial_memory_pages(),
            tables = module.tables.len(),
            globals = module.globals.len(),
            "instantiated module"
        );

        Ok(Instance {
            module,
            exports,
            executor,
        })
    }

    /// Function index of a named export, if present
    pub fn function_export(&self, name: &str) -> Option<u32> {
        self.exports.get(name).copied()
    }

    /// Signature of a named function export
    pub fn export_signature(&self, name: &str) -> Option<&FunctionType> {
        self.module.signature(self.function_export(name)?)
    }

    /// Invoke an exported function by name
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let func_idx = self
            .function_export(name)
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;
        self.executor.invoke(func_idx, args)
    }

    /// Invoke a function by module index
    pub fn invoke_index(&mut self, func_idx: u32, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        self.executor.invoke(func_idx, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Export, Function, FunctionType, ValueType};
    use crate::opcode as op;

    fn module_with_main() -> Module {
        Module {
            types: vec![FunctionType {
                params: vec![ValueType::I32],
                results: vec![ValueType::I32],
            }],
            functions: vec![Function {
                type_index: 0,
                locals: vec![],
                code: vec![op::LOCAL_GET, 0x00, op::END],
            }],
            exports: vec![Export {
                name: "main".to_string(),
                kind: ExportKind::Function,
                index: 0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_export_resolution() {
        let module = module_with_main();
        let instance = Instance::new(&module).unwrap();

        assert_eq!(instance.function_export("main"), Some(0));
        assert_eq!(instance.function_export("start"), None);

        let sig = instance.export_signature("main").unwrap();
        assert_eq!(sig.params, vec![ValueType::I32]);
    }

    #[test]
    fn test_invoke_by_name() {
        let module = module_with_main();
        let mut instance = Instance::new(&module).unwrap();

        let results = instance.invoke("main", vec![Value::I32(-3)]).unwrap();
        assert_eq!(results, vec![Value::I32(-3)]);
    }

    #[test]
    fn test_invoke_unknown_export() {
        let module = module_with_main();
        let mut instance = Instance::new(&module).unwrap();

        assert!(matches!(
            instance.invoke("missing", vec![]),
            Err(RuntimeError::UnknownExport(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_non_function_export_is_not_callable() {
        let mut module = module_with_main();
        module.exports.push(Export {
            name: "mem".to_string(),
            kind: ExportKind::Memory,
            index: 0,
        });
        let instance = Instance::new(&module).unwrap();
        assert_eq!(instance.function_export("mem"), None);
    }
}
