use super::{
    instruction::Instruction,
    types::{Expr, ExportDesc, FunctionLocal, GlobalType, ImportDesc, Limits},
};
use num_derive::FromPrimitive;

// https://webassembly.github.io/spec/core/binary/modules.html#sections
#[derive(Debug, PartialEq, Eq, FromPrimitive)]
pub enum SectionID {
    Custom = 0x00,
    Type = 0x01,
    Import = 0x02,
    Function = 0x03,
    Table = 0x04,
    Memory = 0x05,
    Global = 0x06,
    Export = 0x07,
    Start = 0x08,
    Element = 0x09,
    Code = 0x0A,
    Data = 0x0B,
    DataCount = 0x0C,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Custom {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Memory {
    pub limits: Limits,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Import {
    pub module: String,
    pub field: String,
    pub desc: ImportDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub desc: ExportDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub global_type: GlobalType,
    // the initializer body, up to and including its end opcode
    pub init_expr: Vec<Instruction>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Data {
    pub memory_index: u32,
    pub offset: Expr,
    pub init: Vec<u8>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub locals: Vec<FunctionLocal>,
    pub code: Vec<Instruction>,
}
