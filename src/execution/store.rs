use std::collections::HashMap;

use super::{error::LinkError, value::Value};
use crate::binary::{
    instruction::Instruction,
    module::Module,
    types::{ExportDesc, FuncType, GlobalType, ImportDesc, ValueType},
};

pub const PAGE_SIZE: u32 = 65536; // 64Ki
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug, Clone)]
pub struct Func {
    pub locals: Vec<ValueType>,
    pub body: Vec<Instruction>,
}

#[derive(Debug, Clone)]
pub struct InternalFuncInst {
    pub func_type: FuncType,
    pub code: Func,
}

#[derive(Debug, Clone)]
pub struct ExternalFuncInst {
    pub module: String,
    pub field: String,
    pub func_type: FuncType,
}

#[derive(Debug, Clone)]
pub enum FuncInst {
    Internal(InternalFuncInst),
    External(ExternalFuncInst),
}

#[derive(Debug)]
pub struct ExportInst {
    pub name: String,
    pub desc: ExportDesc,
}

#[derive(Default, Debug)]
pub struct ModuleInst {
    pub exports: HashMap<String, ExportInst>,
}

#[derive(Default, Debug, Clone)]
pub struct MemoryInst {
    pub data: Vec<u8>,
    pub max: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GlobalInst {
    pub global_type: GlobalType,
    pub value: Value,
}

#[derive(Default, Debug)]
pub struct Store {
    pub funcs: Vec<FuncInst>,
    pub memories: Vec<MemoryInst>,
    // filled by the runtime once the initializer expressions have run
    pub globals: Vec<GlobalInst>,
    pub module: ModuleInst,
    pub start: Option<u32>,
}

impl Store {
    pub fn new(module: Module) -> Result<Self, LinkError> {
        let func_type_idxs = match module.function_section {
            Some(ref idxs) => idxs.clone(),
            _ => vec![],
        };

        let mut funcs = vec![];
        let mut memories = vec![];

        // imported functions come first in the index space
        if let Some(ref import_section) = module.import_section {
            for import in import_section {
                let ImportDesc::Func(type_idx) = import.desc;
                let func_type = module
                    .type_section
                    .as_ref()
                    .and_then(|func_types| func_types.get(type_idx as usize))
                    .ok_or(LinkError::UndefinedType(type_idx))?
                    .clone();

                let func = FuncInst::External(ExternalFuncInst {
                    module: import.module.clone(),
                    field: import.field.clone(),
                    func_type,
                });
                funcs.push(func);
            }
        }

        let code_count = module.code_section.as_ref().map_or(0, Vec::len);
        if code_count != func_type_idxs.len() {
            return Err(LinkError::FunctionCountMismatch);
        }

        if let Some(ref code_section) = module.code_section {
            for (func_body, type_idx) in code_section.iter().zip(func_type_idxs.into_iter()) {
                let func_type = module
                    .type_section
                    .as_ref()
                    .and_then(|func_types| func_types.get(type_idx as usize))
                    .ok_or(LinkError::UndefinedType(type_idx))?;

                let mut locals = Vec::with_capacity(func_body.locals.len());
                for local in func_body.locals.iter() {
                    for _ in 0..local.type_count {
                        locals.push(local.value_type);
                    }
                }

                let func = FuncInst::Internal(InternalFuncInst {
                    func_type: func_type.clone(),
                    code: Func {
                        locals,
                        body: func_body.code.clone(),
                    },
                });
                funcs.push(func);
            }
        }

        let mut exports = HashMap::default();
        if let Some(ref sections) = module.export_section {
            for export in sections {
                let name = export.name.clone();
                let export_inst = ExportInst {
                    name: name.clone(),
                    desc: export.desc.clone(),
                };
                exports.insert(name, export_inst);
            }
        };
        let module_inst = ModuleInst { exports };

        if let Some(ref sections) = module.memory_section {
            for memory in sections {
                if memory.limits.min > MAX_PAGES {
                    return Err(LinkError::MemoryAllocFailed {
                        min: memory.limits.min,
                    });
                }
                let min = memory.limits.min as usize * PAGE_SIZE as usize;
                let memory = MemoryInst {
                    data: vec![0; min],
                    max: memory.limits.max,
                };
                memories.push(memory);
            }
        }

        if let Some(ref sections) = module.data_section {
            for data in sections {
                let memory = memories
                    .get_mut(data.memory_index as usize)
                    .ok_or(LinkError::UndefinedMemory(data.memory_index))?;

                let offset = usize::from(&data.offset);
                let init = &data.init;

                let end = offset
                    .checked_add(init.len())
                    .filter(|&end| end <= memory.data.len())
                    .ok_or(LinkError::DataOutOfBounds {
                        memory_index: data.memory_index,
                    })?;
                memory.data[offset..end].copy_from_slice(init);
            }
        }

        Ok(Self {
            funcs,
            memories,
            globals: vec![],
            module: module_inst,
            start: module.start_section,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::binary::module::Module;
    use crate::execution::error::LinkError;
    use anyhow::Result;

    #[test]
    fn init_memory() -> Result<()> {
        let wasm = wat::parse_file("src/fixtures/memory.wat")?;
        let module = Module::new(&wasm)?;
        let store = Store::new(module)?;
        assert_eq!(store.memories.len(), 1);
        assert_eq!(store.memories[0].data.len(), 65536);
        assert_eq!(&store.memories[0].data[0..3], b"ABC");
        assert_eq!(&store.memories[0].data[8..12], b"wasm");
        Ok(())
    }

    #[test]
    fn data_segment_out_of_bounds() -> Result<()> {
        let wasm = wat::parse_str(r#"(module (memory 0) (data (i32.const 0) "x"))"#)?;
        let module = Module::new(&wasm)?;
        let result = Store::new(module);
        assert!(matches!(
            result.unwrap_err(),
            LinkError::DataOutOfBounds { memory_index: 0 }
        ));
        Ok(())
    }

    #[test]
    fn function_without_body() -> Result<()> {
        // a function section entry with no code section to back it
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend([0x03, 0x02, 0x01, 0x00]);
        let module = Module::new(&bytes)?;
        let result = Store::new(module);
        assert!(matches!(
            result.unwrap_err(),
            LinkError::FunctionCountMismatch
        ));
        Ok(())
    }

    #[test]
    fn start_section_is_carried_over() -> Result<()> {
        let wasm = wat::parse_str("(module (func $init) (start $init))")?;
        let module = Module::new(&wasm)?;
        let store = Store::new(module)?;
        assert_eq!(store.start, Some(0));
        Ok(())
    }
}
