use super::{
    error::DecodeError,
    instruction::Instruction,
    opcode::Opcode,
    section::{Custom, Data, Export, Function, Global, Import, Memory, SectionID},
    types::{
        Block, BlockType, Expr, ExprValue, ExportDesc, FuncType, FunctionLocal, GlobalType,
        ImportDesc, Limits, MemoryArg, Mutability, ValueType,
    },
};
use log::trace;
use nom::{
    IResult,
    bytes::complete::{tag, take},
    multi::many0,
    number::complete::{le_u8, le_u32},
    sequence::pair,
};
use nom_leb128::{leb128_i32, leb128_u32};
use num_traits::FromPrimitive as _;

type DecodeResult<'a, T> = IResult<&'a [u8], T, DecodeError>;

#[derive(Default, Debug, PartialEq)]
pub struct Module {
    pub magic: String,
    pub version: u32,
    pub custom_sections: Vec<Custom>,
    pub type_section: Option<Vec<FuncType>>,
    pub import_section: Option<Vec<Import>>,
    pub function_section: Option<Vec<u32>>,
    pub memory_section: Option<Vec<Memory>>,
    pub global_section: Option<Vec<Global>>,
    pub export_section: Option<Vec<Export>>,
    pub start_section: Option<u32>,
    pub code_section: Option<Vec<Function>>,
    pub data_section: Option<Vec<Data>>,
}

/// Where a function index resolves: a host import or a code section entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionRef {
    Host(u32),
    Local(u32),
}

impl Module {
    pub fn new(input: &[u8]) -> Result<Module, DecodeError> {
        match Module::decode(input) {
            Ok((_, module)) => Ok(module),
            Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(err),
            Err(nom::Err::Incomplete(_)) => Err(DecodeError::ShortRead),
        }
    }

    fn decode(input: &[u8]) -> DecodeResult<Module> {
        let (input, _) = tag(b"\0asm")(input)?;
        let (input, version) = le_u32(input)?;
        if version != 1 {
            return Err(nom::Err::Failure(DecodeError::UnsupportedVersion(version)));
        }

        let mut module = Module {
            magic: "\0asm".into(),
            version,
            ..Default::default()
        };

        let mut remaining = input;

        while !remaining.is_empty() {
            let (input, (id, size)) = decode_section_header(remaining)?;
            let (rest, section_bytes) = take(size)(input)?;
            trace!("decode section {:?} ({} bytes)", id, size);

            match id {
                SectionID::Custom => {
                    let (leftover, custom) = decode_custom_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.custom_sections.push(custom);
                }
                SectionID::Type => {
                    let (leftover, func_types) = decode_type_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.type_section = Some(func_types);
                }
                SectionID::Import => {
                    let (leftover, imports) = decode_import_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.import_section = Some(imports);
                }
                SectionID::Function => {
                    let (leftover, func_idx_list) = decode_function_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.function_section = Some(func_idx_list);
                }
                SectionID::Memory => {
                    let (leftover, memories) = decode_memory_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.memory_section = Some(memories);
                }
                SectionID::Global => {
                    let (leftover, globals) = decode_global_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.global_section = Some(globals);
                }
                SectionID::Export => {
                    let (leftover, exports) = decode_export_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.export_section = Some(exports);
                }
                SectionID::Start => {
                    let (leftover, func_idx) = leb128_u32(section_bytes)?;
                    all_consumed(leftover)?;
                    module.start_section = Some(func_idx);
                }
                SectionID::Code => {
                    let (leftover, funcs) = decode_code_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.code_section = Some(funcs);
                }
                SectionID::Data => {
                    let (leftover, data) = decode_data_section(section_bytes)?;
                    all_consumed(leftover)?;
                    module.data_section = Some(data);
                }
                // tables and element segments are out of scope, the data
                // count section is only a hint; skip their payloads
                SectionID::Table | SectionID::Element | SectionID::DataCount => {}
            }

            remaining = rest;
        }

        Ok((remaining, module))
    }

    // Only function imports decode in this subset, so every import entry
    // occupies one slot of the function index space.
    pub fn imported_function_count(&self) -> usize {
        self.import_section.as_ref().map_or(0, Vec::len)
    }

    pub fn function_by_index(&self, idx: u32) -> Option<FunctionRef> {
        let imported = self.imported_function_count() as u32;
        if idx < imported {
            return Some(FunctionRef::Host(idx));
        }
        let local = idx - imported;
        let defined = self.function_section.as_ref().map_or(0, Vec::len) as u32;
        (local < defined).then_some(FunctionRef::Local(local))
    }

    pub fn type_of_function(&self, idx: u32) -> Option<&FuncType> {
        let type_idx = match self.function_by_index(idx)? {
            FunctionRef::Host(import_idx) => {
                let imports = self.import_section.as_ref()?;
                let ImportDesc::Func(type_idx) = imports.get(import_idx as usize)?.desc;
                type_idx
            }
            FunctionRef::Local(code_idx) => {
                *self.function_section.as_ref()?.get(code_idx as usize)?
            }
        };
        self.type_section.as_ref()?.get(type_idx as usize)
    }
}

fn all_consumed(input: &[u8]) -> Result<(), nom::Err<DecodeError>> {
    if input.is_empty() {
        Ok(())
    } else {
        Err(nom::Err::Failure(DecodeError::InconsistentSize))
    }
}

fn decode_section_header(input: &[u8]) -> DecodeResult<(SectionID, u32)> {
    let (input, (id, size)) = pair(le_u8, leb128_u32)(input)?;
    let id = SectionID::from_u8(id).ok_or(nom::Err::Failure(DecodeError::UnknownSectionId(id)))?;
    Ok((input, (id, size)))
}

fn decode_name(input: &[u8]) -> DecodeResult<String> {
    let (input, size) = leb128_u32(input)?;
    let (input, name) = take(size)(input)?;
    Ok((input, String::from_utf8_lossy(name).into_owned()))
}

fn decode_value_type(input: &[u8]) -> DecodeResult<ValueType> {
    let (input, byte) = le_u8(input)?;
    let value_type = ValueType::try_from(byte).map_err(nom::Err::Failure)?;
    Ok((input, value_type))
}

fn decode_custom_section(input: &[u8]) -> DecodeResult<Custom> {
    let (input, name) = decode_name(input)?;
    let data = input.to_vec();
    Ok((&[], Custom { name, data }))
}

fn decode_type_section(input: &[u8]) -> DecodeResult<Vec<FuncType>> {
    let mut func_types: Vec<FuncType> = vec![];

    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, form) = le_u8(input)?;
        if form != 0x60 {
            return Err(nom::Err::Failure(DecodeError::UnsupportedType(form)));
        }
        let mut func = FuncType::default();

        // value types are one byte each, so the declared count is also the
        // byte width of the run
        let (rest, size) = leb128_u32(rest)?;
        let (rest, types) = take(size)(rest)?;
        let (_, types) = many0(decode_value_type)(types)?;
        func.params = types;

        let (rest, size) = leb128_u32(rest)?;
        let (rest, types) = take(size)(rest)?;
        let (_, types) = many0(decode_value_type)(types)?;
        func.results = types;

        func_types.push(func);
        input = rest;
    }
    Ok((input, func_types))
}

fn decode_import_section(input: &[u8]) -> DecodeResult<Vec<Import>> {
    let mut imports = vec![];

    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, module) = decode_name(input)?;
        let (rest, field) = decode_name(rest)?;

        let (rest, import_kind) = le_u8(rest)?;
        let (rest, desc) = match import_kind {
            0x00 => {
                let (rest, type_idx) = leb128_u32(rest)?;
                (rest, ImportDesc::Func(type_idx))
            }
            _ => {
                return Err(nom::Err::Failure(DecodeError::UnsupportedImportKind(
                    import_kind,
                )));
            }
        };

        imports.push(Import {
            module,
            field,
            desc,
        });

        input = rest;
    }

    Ok((input, imports))
}

fn decode_function_section(input: &[u8]) -> DecodeResult<Vec<u32>> {
    let mut func_idx_list = vec![];
    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, idx) = leb128_u32(input)?;
        func_idx_list.push(idx);
        input = rest;
    }

    Ok((input, func_idx_list))
}

fn decode_limits(input: &[u8]) -> DecodeResult<Limits> {
    let (mut input, (flags, min)) = pair(leb128_u32, leb128_u32)(input)?;
    let max = if flags == 0 {
        None
    } else {
        let (rest, max) = leb128_u32(input)?;
        input = rest;
        Some(max)
    };

    Ok((input, Limits { min, max }))
}

fn decode_memory_section(input: &[u8]) -> DecodeResult<Vec<Memory>> {
    let mut memories = vec![];
    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, limits) = decode_limits(input)?;
        memories.push(Memory { limits });
        input = rest;
    }

    Ok((input, memories))
}

fn decode_global_section(input: &[u8]) -> DecodeResult<Vec<Global>> {
    let mut globals = vec![];
    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, value_type) = decode_value_type(input)?;
        let (rest, flag) = le_u8(rest)?;
        let mutability = Mutability::from_u8(flag)
            .ok_or(nom::Err::Failure(DecodeError::InvalidMutability(flag)))?;
        let (rest, init_expr) = decode_init_expr(rest)?;

        globals.push(Global {
            global_type: GlobalType {
                value_type,
                mutability,
            },
            init_expr,
        });

        input = rest;
    }

    Ok((input, globals))
}

// The initializer body is kept as instructions so the engine can evaluate it
// with an ordinary frame.
fn decode_init_expr(input: &[u8]) -> DecodeResult<Vec<Instruction>> {
    let mut insts = vec![];
    let mut input = input;

    loop {
        let (rest, inst) = decode_instructions(input)?;
        input = rest;
        let done = inst == Instruction::End;
        insts.push(inst);
        if done {
            break;
        }
    }

    Ok((input, insts))
}

fn decode_export_section(input: &[u8]) -> DecodeResult<Vec<Export>> {
    let mut exports = vec![];

    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, name) = decode_name(input)?;

        let (rest, export_kind) = le_u8(rest)?;
        let (rest, idx) = leb128_u32(rest)?;
        let desc = match export_kind {
            0x00 => ExportDesc::Func(idx),
            0x01 => ExportDesc::Table(idx),
            0x02 => ExportDesc::Memory(idx),
            0x03 => ExportDesc::Global(idx),
            _ => {
                return Err(nom::Err::Failure(DecodeError::UnknownExportKind(
                    export_kind,
                )));
            }
        };

        exports.push(Export { name, desc });

        input = rest;
    }

    Ok((input, exports))
}

fn decode_code_section(input: &[u8]) -> DecodeResult<Vec<Function>> {
    let mut functions = vec![];
    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, size) = leb128_u32(input)?;
        let (rest, body) = take(size)(rest)?;
        let (_, body) = decode_function_body(body)?;
        functions.push(body);
        input = rest;
    }

    Ok((input, functions))
}

fn decode_function_body(input: &[u8]) -> DecodeResult<Function> {
    let mut body = Function::default();

    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, type_count) = leb128_u32(input)?;
        let (rest, value_type) = decode_value_type(rest)?;
        if value_type != ValueType::I32 {
            return Err(nom::Err::Failure(DecodeError::UnsupportedLocalType(
                value_type,
            )));
        }
        body.locals.push(FunctionLocal {
            type_count,
            value_type,
        });
        input = rest;
    }

    // whatever remains of the declared body is the instruction stream; it is
    // never reconstructed from fixed-width immediates
    let mut remaining = input;

    while !remaining.is_empty() {
        let (rest, inst) = decode_instructions(remaining)?;
        body.code.push(inst);
        remaining = rest;
    }

    Ok((remaining, body))
}

fn decode_data_section(input: &[u8]) -> DecodeResult<Vec<Data>> {
    let mut data = vec![];
    let (mut input, count) = leb128_u32(input)?;

    for _ in 0..count {
        let (rest, memory_index) = leb128_u32(input)?;
        let (rest, offset) = decode_expr(rest)?;
        let (rest, size) = leb128_u32(rest)?;
        let (rest, init) = take(size)(rest)?;

        data.push(Data {
            memory_index,
            offset,
            init: init.to_vec(),
        });

        input = rest;
    }
    Ok((input, data))
}

// Data segment offsets are restricted to the `i32.const … end` form.
fn decode_expr(input: &[u8]) -> DecodeResult<Expr> {
    let (input, byte) = le_u8(input)?;
    let op = Opcode::from_u8(byte).ok_or(nom::Err::Failure(DecodeError::UnknownOpcode(byte)))?;
    let (input, value) = match op {
        Opcode::I32Const => {
            let (input, value) = leb128_i32(input)?;
            (input, Expr::Value(ExprValue::I32(value)))
        }
        _ => return Err(nom::Err::Failure(DecodeError::InvalidInitExpr(byte))),
    };
    let (input, end) = le_u8(input)?;
    if end != Opcode::End as u8 {
        return Err(nom::Err::Failure(DecodeError::InvalidInitExpr(end)));
    }
    Ok((input, value))
}

fn decode_block(input: &[u8]) -> DecodeResult<Block> {
    let (input, byte) = le_u8(input)?;

    let block_type = if byte == 0x40 {
        BlockType::Empty
    } else {
        let value_type = ValueType::try_from(byte).map_err(nom::Err::Failure)?;
        BlockType::Value(vec![value_type])
    };

    Ok((input, Block { block_type }))
}

fn decode_memory_arg(input: &[u8]) -> DecodeResult<MemoryArg> {
    let (input, (align, offset)) = pair(leb128_u32, leb128_u32)(input)?;
    Ok((input, MemoryArg { align, offset }))
}

fn decode_instructions(input: &[u8]) -> DecodeResult<Instruction> {
    let (input, byte) = le_u8(input)?;
    let op = Opcode::from_u8(byte).ok_or(nom::Err::Failure(DecodeError::UnknownOpcode(byte)))?;
    trace!("decode opcode: {:?}", op);
    let (rest, inst) = match op {
        Opcode::Unreachable => (input, Instruction::Unreachable),
        Opcode::Nop => (input, Instruction::Nop),
        Opcode::Block => {
            let (rest, block) = decode_block(input)?;
            (rest, Instruction::Block(block))
        }
        Opcode::Loop => {
            let (rest, block) = decode_block(input)?;
            (rest, Instruction::Loop(block))
        }
        Opcode::If => {
            let (rest, block) = decode_block(input)?;
            (rest, Instruction::If(block))
        }
        Opcode::Else => (input, Instruction::Else),
        Opcode::End => (input, Instruction::End),
        Opcode::Br => {
            let (rest, level) = leb128_u32(input)?;
            (rest, Instruction::Br(level))
        }
        Opcode::BrIf => {
            let (rest, level) = leb128_u32(input)?;
            (rest, Instruction::BrIf(level))
        }
        Opcode::Return => (input, Instruction::Return),
        Opcode::Call => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::Call(idx))
        }
        Opcode::Drop => (input, Instruction::Drop),
        Opcode::LocalGet => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::LocalGet(idx))
        }
        Opcode::LocalSet => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::LocalSet(idx))
        }
        Opcode::LocalTee => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::LocalTee(idx))
        }
        Opcode::GlobalGet => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::GlobalGet(idx))
        }
        Opcode::GlobalSet => {
            let (rest, idx) = leb128_u32(input)?;
            (rest, Instruction::GlobalSet(idx))
        }
        Opcode::I32Load => {
            let (rest, arg) = decode_memory_arg(input)?;
            (rest, Instruction::I32Load(arg))
        }
        Opcode::I32Load8U => {
            let (rest, arg) = decode_memory_arg(input)?;
            (rest, Instruction::I32Load8U(arg))
        }
        Opcode::I32Store => {
            let (rest, arg) = decode_memory_arg(input)?;
            (rest, Instruction::I32Store(arg))
        }
        Opcode::I32Const => {
            let (rest, value) = leb128_i32(input)?;
            (rest, Instruction::I32Const(value))
        }
        Opcode::I32Eqz => (input, Instruction::I32Eqz),
        Opcode::I32Eq => (input, Instruction::I32Eq),
        Opcode::I32Ne => (input, Instruction::I32Ne),
        Opcode::I32LtS => (input, Instruction::I32LtS),
        Opcode::I32Add => (input, Instruction::I32Add),
        Opcode::I32Sub => (input, Instruction::I32Sub),
        Opcode::I32Mul => (input, Instruction::I32Mul),
        Opcode::I32DivS => (input, Instruction::I32DivS),
    };
    Ok((rest, inst))
}

#[cfg(test)]
mod tests {
    use super::{FunctionRef, Module};
    use crate::binary::{
        error::DecodeError,
        instruction::Instruction,
        section::{Export, Function, Global},
        types::{ExportDesc, FuncType, GlobalType, Mutability, ValueType},
    };
    use anyhow::Result;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_func_add() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                 (func (export "add") (param i32 i32) (result i32)
                   local.get 0
                   local.get 1
                   i32.add))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module,
            Module {
                magic: "\0asm".into(),
                version: 1,
                type_section: Some(vec![FuncType {
                    params: vec![ValueType::I32, ValueType::I32],
                    results: vec![ValueType::I32],
                }]),
                function_section: Some(vec![0]),
                export_section: Some(vec![Export {
                    name: "add".into(),
                    desc: ExportDesc::Func(0),
                }]),
                code_section: Some(vec![Function {
                    locals: vec![],
                    code: vec![
                        Instruction::LocalGet(0),
                        Instruction::LocalGet(1),
                        Instruction::I32Add,
                        Instruction::End,
                    ],
                }]),
                ..Default::default()
            }
        );
        Ok(())
    }

    #[test]
    fn decode_globals_and_start() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                 (global $counter (mut i32) (i32.const 42))
                 (global $base i32 (i32.const 1))
                 (func $init)
                 (start $init))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(
            module.global_section,
            Some(vec![
                Global {
                    global_type: GlobalType {
                        value_type: ValueType::I32,
                        mutability: Mutability::Var,
                    },
                    init_expr: vec![Instruction::I32Const(42), Instruction::End],
                },
                Global {
                    global_type: GlobalType {
                        value_type: ValueType::I32,
                        mutability: Mutability::Const,
                    },
                    init_expr: vec![Instruction::I32Const(1), Instruction::End],
                },
            ])
        );
        assert_eq!(module.start_section, Some(0));
        Ok(())
    }

    #[test]
    fn decode_sleb128_immediates() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module (func
                 i32.const 0
                 drop
                 i32.const 127
                 drop
                 i32.const 128
                 drop
                 i32.const -128
                 drop))"#,
        )?;
        let module = Module::new(&wasm)?;
        let code = &module.code_section.unwrap()[0].code;
        assert_eq!(
            code,
            &vec![
                Instruction::I32Const(0),
                Instruction::Drop,
                Instruction::I32Const(127),
                Instruction::Drop,
                Instruction::I32Const(128),
                Instruction::Drop,
                Instruction::I32Const(-128),
                Instruction::Drop,
                Instruction::End,
            ]
        );
        Ok(())
    }

    #[test]
    fn decode_twice_yields_equal_modules() -> Result<()> {
        let wasm = wat::parse_str(include_str!("../fixtures/loop_count.wat"))?;
        assert_eq!(Module::new(&wasm)?, Module::new(&wasm)?);
        Ok(())
    }

    #[test]
    fn function_index_resolution() -> Result<()> {
        let wasm = wat::parse_str(
            r#"(module
                 (import "env" "add" (func (param i32 i32) (result i32)))
                 (func (export "double") (param i32) (result i32)
                   local.get 0
                   local.get 0
                   i32.add))"#,
        )?;
        let module = Module::new(&wasm)?;
        assert_eq!(module.imported_function_count(), 1);
        assert_eq!(module.function_by_index(0), Some(FunctionRef::Host(0)));
        assert_eq!(module.function_by_index(1), Some(FunctionRef::Local(0)));
        assert_eq!(module.function_by_index(2), None);
        assert_eq!(module.type_of_function(0).unwrap().params.len(), 2);
        assert_eq!(module.type_of_function(1).unwrap().params.len(), 1);
        assert!(module.type_of_function(2).is_none());
        Ok(())
    }

    #[test]
    fn reject_invalid_magic() {
        let result = Module::new(b"wasm\x01\x00\x00\x00");
        assert_eq!(result.unwrap_err(), DecodeError::InvalidMagic);
    }

    #[test]
    fn reject_unsupported_version() {
        let result = Module::new(b"\0asm\x02\x00\x00\x00");
        assert_eq!(result.unwrap_err(), DecodeError::UnsupportedVersion(2));
    }

    #[test]
    fn reject_truncated_preamble() {
        let result = Module::new(b"\0asm\x01\x00");
        assert_eq!(result.unwrap_err(), DecodeError::ShortRead);
    }

    #[test]
    fn reject_unknown_section_id() {
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x0D, 0x00]);
        let result = Module::new(&bytes);
        assert_eq!(result.unwrap_err(), DecodeError::UnknownSectionId(0x0D));
    }

    #[test]
    fn reject_overlong_leb128_section_size() {
        // a u32 never takes six LEB128 bytes
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x01, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(Module::new(&bytes).is_err());
    }

    #[test]
    fn reject_non_func_type_form() {
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x01, 0x02, 0x01, 0x59]);
        let result = Module::new(&bytes);
        assert_eq!(result.unwrap_err(), DecodeError::UnsupportedType(0x59));
    }

    #[test]
    fn reject_oversized_section_payload() {
        // type section claims five bytes but ()->() only occupies four
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x01, 0x05, 0x01, 0x60, 0x00, 0x00, 0x00]);
        let result = Module::new(&bytes);
        assert_eq!(result.unwrap_err(), DecodeError::InconsistentSize);
    }

    #[test]
    fn reject_unknown_opcode_in_body() {
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x01, 0x04, 0x01, 0x60, 0x00, 0x00]); // type: () -> ()
        bytes.extend([0x03, 0x02, 0x01, 0x00]); // function: one entry, type 0
        bytes.extend([0x0A, 0x04, 0x01, 0x02, 0x00, 0xFE]); // code: bad opcode
        let result = Module::new(&bytes);
        assert_eq!(result.unwrap_err(), DecodeError::UnknownOpcode(0xFE));
    }

    #[test]
    fn reject_non_function_import() {
        let wasm = wat::parse_str(r#"(module (import "env" "mem" (memory 1)))"#).unwrap();
        let result = Module::new(&wasm);
        assert_eq!(result.unwrap_err(), DecodeError::UnsupportedImportKind(0x02));
    }

    #[test]
    fn collect_custom_sections() -> Result<()> {
        let mut bytes = b"\0asm\x01\x00\x00\x00".to_vec();
        bytes.extend([0x00, 0x06, 0x04]); // custom section, name "name"
        bytes.extend(b"name");
        bytes.extend([0xDE]); // one byte of payload
        let module = Module::new(&bytes)?;
        assert_eq!(module.custom_sections.len(), 1);
        assert_eq!(module.custom_sections[0].name, "name");
        assert_eq!(module.custom_sections[0].data, vec![0xDE]);
        Ok(())
    }
}
