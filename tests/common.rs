//! Common test utilities shared between integration tests
#![allow(dead_code)]

use wasmite::module::{
    Export, ExportKind, Function, FunctionType, LocalGroup, MemoryType, Module, ValueType,
};

/// Build a module with one page of memory exporting a single `main`
pub fn main_module(
    params: Vec<ValueType>,
    results: Vec<ValueType>,
    locals: Vec<(u32, ValueType)>,
    code: Vec<u8>,
) -> Module {
    Module {
        types: vec![FunctionType { params, results }],
        functions: vec![Function {
            type_index: 0,
            locals: locals
                .into_iter()
                .map(|(count, value_type)| LocalGroup { count, value_type })
                .collect(),
            code,
        }],
        memories: vec![MemoryType { initial_pages: 1 }],
        exports: vec![Export {
            name: "main".to_string(),
            kind: ExportKind::Function,
            index: 0,
        }],
        ..Default::default()
    }
}

/// Run the module's main through the driver and capture stdout
pub fn run_main(module: &Module, args: &[&str]) -> String {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    wasmite::driver::run(module, &args, &mut out).expect("driver run failed");
    String::from_utf8(out).expect("driver output was not utf-8")
}
