use std::mem::size_of;

use super::{
    error::{LinkError, Trap},
    import::ImportTable,
    store::{ExternalFuncInst, FuncInst, GlobalInst, InternalFuncInst, Store},
    value::{Label, LabelKind, Value},
};
use crate::Error;
use crate::binary::{
    instruction::Instruction, module::Module, section::Global, types::ExportDesc,
};
use log::{debug, trace};

pub struct Frame {
    pub pc: isize,
    pub sp: usize,
    pub insts: Vec<Instruction>,
    pub arity: usize,
    pub labels: Vec<Label>,
    pub locals: Vec<Value>,
}

#[derive(Default)]
pub struct Runtime {
    pub store: Store,
    pub stack: Vec<Value>,
    pub call_stack: Vec<Frame>,
    pub imports: ImportTable,
}

impl Runtime {
    pub fn instantiate(wasm: impl AsRef<[u8]>) -> Result<Self, Error> {
        let module = Module::new(wasm.as_ref())?;
        Ok(Self::new(module)?)
    }

    pub fn new(module: Module) -> Result<Self, LinkError> {
        let globals = module.global_section.clone().unwrap_or_default();
        let store = Store::new(module)?;
        let mut runtime = Self {
            store,
            ..Default::default()
        };
        runtime.init_globals(globals)?;
        Ok(runtime)
    }

    pub fn add_import(
        &mut self,
        module_name: impl Into<String>,
        func_name: impl Into<String>,
        func: impl FnMut(&mut Store, Vec<Value>) -> anyhow::Result<Option<Value>> + 'static,
    ) {
        let module = self.imports.entry(module_name.into()).or_default();
        module.insert(func_name.into(), Box::new(func));
    }

    pub fn call(&mut self, name: impl Into<String>, args: Vec<Value>) -> Result<Option<Value>, Trap> {
        let name = name.into();
        let idx = match self.store.module.exports.get(&name) {
            Some(export) => match export.desc {
                ExportDesc::Func(idx) => idx,
                _ => return Err(Trap::UndefinedExport(name)),
            },
            None => return Err(Trap::UndefinedExport(name)),
        };
        debug!("call {:?} (function {}) with {:?}", name, idx, args);
        self.call_index(idx, args)
    }

    pub fn call_index(&mut self, idx: u32, args: Vec<Value>) -> Result<Option<Value>, Trap> {
        let Some(func_inst) = self.store.funcs.get(idx as usize) else {
            return Err(Trap::UndefinedFunction(idx));
        };
        let func_inst = func_inst.clone();
        for arg in args {
            self.stack.push(arg);
        }
        match func_inst {
            FuncInst::Internal(func) => self.invoke_internal(func),
            FuncInst::External(func) => self.invoke_external(func),
        }
    }

    /// Runs the start section function, if the module declares one.
    pub fn run_start(&mut self) -> Result<(), Trap> {
        let Some(idx) = self.store.start else {
            return Ok(());
        };
        debug!("run start function {}", idx);
        self.call_index(idx, vec![])?;
        Ok(())
    }

    fn init_globals(&mut self, globals: Vec<Global>) -> Result<(), LinkError> {
        for global in globals {
            let value = self
                .eval_init_expr(global.init_expr)
                .map_err(LinkError::GlobalInitFailed)?;
            self.store.globals.push(GlobalInst {
                global_type: global.global_type,
                value,
            });
        }
        Ok(())
    }

    // Constant initializers run through the ordinary dispatch loop with a
    // synthetic frame that has no locals.
    fn eval_init_expr(&mut self, insts: Vec<Instruction>) -> Result<Value, Trap> {
        let frame = Frame {
            pc: -1,
            sp: self.stack.len(),
            insts,
            arity: 1,
            labels: vec![],
            locals: vec![],
        };
        self.call_stack.push(frame);

        if let Err(trap) = self.execute() {
            self.cleanup();
            return Err(trap);
        }

        self.stack.pop().ok_or(Trap::StackUnderflow)
    }

    fn push_frame(&mut self, func: &InternalFuncInst) -> Result<(), Trap> {
        let params = func.func_type.params.len();
        if self.stack.len() < params {
            return Err(Trap::StackUnderflow);
        }
        let bottom = self.stack.len() - params;
        let mut locals = self.stack.split_off(bottom);

        // declared locals are zero-initialized after the parameters; non-i32
        // runs were rejected at decode time
        for _ in func.code.locals.iter() {
            locals.push(Value::I32(0));
        }

        let arity = func.func_type.results.len();

        let frame = Frame {
            pc: -1,
            sp: self.stack.len(),
            insts: func.code.body.clone(),
            arity,
            locals,
            labels: vec![],
        };

        self.call_stack.push(frame);
        Ok(())
    }

    fn invoke_internal(&mut self, func: InternalFuncInst) -> Result<Option<Value>, Trap> {
        let arity = func.func_type.results.len();

        if let Err(trap) = self.push_frame(&func) {
            self.cleanup();
            return Err(trap);
        }

        if let Err(trap) = self.execute() {
            self.cleanup();
            return Err(trap);
        }

        if arity > 0 {
            let value = self.stack.pop().ok_or(Trap::StackUnderflow)?;
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn invoke_external(&mut self, func: ExternalFuncInst) -> Result<Option<Value>, Trap> {
        let params = func.func_type.params.len();
        if self.stack.len() < params {
            return Err(Trap::StackUnderflow);
        }
        // the arguments leave the stack in source order: the topmost operand
        // is the last parameter
        let args = self.stack.split_off(self.stack.len() - params);

        let import_func = self
            .imports
            .get_mut(&func.module)
            .and_then(|module| module.get_mut(&func.field))
            .ok_or_else(|| Trap::MissingImport {
                module: func.module.clone(),
                field: func.field.clone(),
            })?;

        import_func(&mut self.store, args).map_err(Trap::Host)
    }

    fn execute(&mut self) -> Result<(), Trap> {
        loop {
            let Some(frame) = self.call_stack.last_mut() else {
                break;
            };

            frame.pc += 1;

            let Some(inst) = frame.insts.get(frame.pc as usize) else {
                return Err(Trap::MissingEnd);
            };

            trace!("execute {:?} (stack: {:?})", inst, self.stack);

            match inst {
                Instruction::Unreachable => return Err(Trap::Unreachable),
                Instruction::Nop => {}
                Instruction::Block(block) => {
                    let label = Label {
                        kind: LabelKind::Block,
                        start: None,
                        sp: self.stack.len(),
                        arity: block.block_type.result_count(),
                    };
                    frame.labels.push(label);
                }
                Instruction::Loop(block) => {
                    let label = Label {
                        kind: LabelKind::Loop,
                        start: Some(frame.pc),
                        sp: self.stack.len(),
                        arity: block.block_type.result_count(),
                    };
                    frame.labels.push(label);
                }
                Instruction::If(block) => {
                    let cond = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    let label = Label {
                        kind: LabelKind::If,
                        start: None,
                        sp: self.stack.len(),
                        arity: block.block_type.result_count(),
                    };

                    if i32::from(cond) == 0 {
                        // jump to the else arm when there is one, past the
                        // end otherwise
                        let addr = get_else_or_end_address(&frame.insts, frame.pc as usize)?;
                        if let Some(Instruction::Else) = frame.insts.get(addr) {
                            frame.labels.push(label);
                        }
                        frame.pc = addr as isize;
                    } else {
                        frame.labels.push(label);
                    }
                }
                Instruction::Else => {
                    // the then arm ran to completion; skip over the else arm
                    let label = frame.labels.pop().ok_or(Trap::UndefinedLabel(0))?;
                    let addr = get_end_address(&frame.insts, frame.pc as usize)?;
                    stack_unwind(&mut self.stack, label.sp, label.arity)?;
                    frame.pc = addr as isize;
                }
                Instruction::End => match frame.labels.pop() {
                    Some(label) => {
                        stack_unwind(&mut self.stack, label.sp, label.arity)?;
                    }
                    None => {
                        let Some(frame) = self.call_stack.pop() else {
                            return Err(Trap::StackUnderflow);
                        };
                        stack_unwind(&mut self.stack, frame.sp, frame.arity)?;
                    }
                },
                Instruction::Br(level) => {
                    let level = *level;
                    branch(frame, &mut self.stack, level)?;
                }
                Instruction::BrIf(level) => {
                    let level = *level;
                    let cond = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    if i32::from(cond) != 0 {
                        branch(frame, &mut self.stack, level)?;
                    }
                }
                Instruction::Return => {
                    let Some(frame) = self.call_stack.pop() else {
                        return Err(Trap::StackUnderflow);
                    };
                    stack_unwind(&mut self.stack, frame.sp, frame.arity)?;
                }
                Instruction::Call(idx) => {
                    let Some(func) = self.store.funcs.get(*idx as usize) else {
                        return Err(Trap::UndefinedFunction(*idx));
                    };
                    let func_inst = func.clone();
                    match func_inst {
                        FuncInst::Internal(func) => self.push_frame(&func)?,
                        FuncInst::External(func) => {
                            if let Some(value) = self.invoke_external(func)? {
                                self.stack.push(value);
                            }
                        }
                    }
                }
                Instruction::Drop => {
                    self.stack.pop().ok_or(Trap::StackUnderflow)?;
                }
                Instruction::LocalGet(idx) => {
                    let Some(value) = frame.locals.get(*idx as usize) else {
                        return Err(Trap::UndefinedLocal(*idx));
                    };
                    self.stack.push(*value);
                }
                Instruction::LocalSet(idx) => {
                    let value = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    let Some(local) = frame.locals.get_mut(*idx as usize) else {
                        return Err(Trap::UndefinedLocal(*idx));
                    };
                    *local = value;
                }
                Instruction::LocalTee(idx) => {
                    let value = *self.stack.last().ok_or(Trap::StackUnderflow)?;
                    let Some(local) = frame.locals.get_mut(*idx as usize) else {
                        return Err(Trap::UndefinedLocal(*idx));
                    };
                    *local = value;
                }
                Instruction::GlobalGet(idx) => {
                    let Some(global) = self.store.globals.get(*idx as usize) else {
                        return Err(Trap::UndefinedGlobal(*idx));
                    };
                    self.stack.push(global.value);
                }
                Instruction::GlobalSet(idx) => {
                    let value = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    let Some(global) = self.store.globals.get_mut(*idx as usize) else {
                        return Err(Trap::UndefinedGlobal(*idx));
                    };
                    global.value = value;
                }
                Instruction::I32Load(arg) => {
                    let addr = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    let at = i32::from(addr) as u32 as usize + arg.offset as usize;
                    let end = at + size_of::<i32>();
                    let memory = self
                        .store
                        .memories
                        .first()
                        .ok_or(Trap::MemoryOutOfBounds)?;
                    let bytes = memory.data.get(at..end).ok_or(Trap::MemoryOutOfBounds)?;
                    let mut buf = [0; size_of::<i32>()];
                    buf.copy_from_slice(bytes);
                    self.stack.push(Value::I32(i32::from_le_bytes(buf)));
                }
                Instruction::I32Load8U(arg) => {
                    let addr = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    let at = i32::from(addr) as u32 as usize + arg.offset as usize;
                    let memory = self
                        .store
                        .memories
                        .first()
                        .ok_or(Trap::MemoryOutOfBounds)?;
                    let byte = memory.data.get(at).copied().ok_or(Trap::MemoryOutOfBounds)?;
                    self.stack.push(Value::I32(byte as i32));
                }
                Instruction::I32Store(arg) => {
                    let (Some(value), Some(addr)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    let at = i32::from(addr) as u32 as usize + arg.offset as usize;
                    let end = at + size_of::<i32>();
                    let memory = self
                        .store
                        .memories
                        .first_mut()
                        .ok_or(Trap::MemoryOutOfBounds)?;
                    let bytes = memory
                        .data
                        .get_mut(at..end)
                        .ok_or(Trap::MemoryOutOfBounds)?;
                    bytes.copy_from_slice(&i32::from(value).to_le_bytes());
                }
                Instruction::I32Const(value) => self.stack.push(Value::I32(*value)),
                Instruction::I32Eqz => {
                    let value = self.stack.pop().ok_or(Trap::StackUnderflow)?;
                    self.stack.push((i32::from(value) == 0).into());
                }
                Instruction::I32Eq => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push((left == right).into());
                }
                Instruction::I32Ne => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push((left != right).into());
                }
                Instruction::I32LtS => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push((left < right).into());
                }
                Instruction::I32Add => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push(left + right);
                }
                Instruction::I32Sub => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push(left - right);
                }
                Instruction::I32Mul => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    self.stack.push(left * right);
                }
                Instruction::I32DivS => {
                    let (Some(right), Some(left)) = (self.stack.pop(), self.stack.pop()) else {
                        return Err(Trap::StackUnderflow);
                    };
                    let divisor = i32::from(right);
                    if divisor == 0 {
                        return Err(Trap::DivideByZero);
                    }
                    self.stack
                        .push(Value::I32(i32::from(left).wrapping_div(divisor)));
                }
            }
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        self.stack = vec![];
        self.call_stack = vec![];
    }
}

fn branch(frame: &mut Frame, stack: &mut Vec<Value>, level: u32) -> Result<(), Trap> {
    let label_index = frame
        .labels
        .len()
        .checked_sub(1 + level as usize)
        .ok_or(Trap::UndefinedLabel(level))?;
    let label = frame.labels[label_index].clone();

    if label.kind == LabelKind::Loop {
        // re-enter the loop at its opener; the target label stays live
        let start = label.start.ok_or(Trap::UndefinedLabel(level))?;
        frame.labels.truncate(label_index + 1);
        stack.truncate(label.sp);
        frame.pc = start;
    } else {
        // leave past the target's end, carrying its results
        let addr = get_br_address(&frame.insts, frame.pc as usize, level)?;
        frame.labels.truncate(label_index);
        stack_unwind(stack, label.sp, label.arity)?;
        frame.pc = addr as isize;
    }
    Ok(())
}

// Forward scans over decoded instructions. Depth counts structured openers
// passed along the way, so a nested end can never match the wrong region.

pub fn get_end_address(insts: &[Instruction], pc: usize) -> Result<usize, Trap> {
    let mut pc = pc;
    let mut depth = 0;
    loop {
        pc += 1;
        let inst = insts.get(pc).ok_or(Trap::MissingEnd)?;
        match inst {
            Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) => depth += 1,
            Instruction::End => {
                if depth == 0 {
                    return Ok(pc);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

pub fn get_else_or_end_address(insts: &[Instruction], pc: usize) -> Result<usize, Trap> {
    let mut pc = pc;
    let mut depth = 0;
    loop {
        pc += 1;
        let inst = insts.get(pc).ok_or(Trap::MissingEnd)?;
        match inst {
            Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) => depth += 1,
            Instruction::Else if depth == 0 => return Ok(pc),
            Instruction::End => {
                if depth == 0 {
                    return Ok(pc);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

// The end that closes the label at `level` is the (level + 1)-th end not
// matched by an opener seen during the scan.
fn get_br_address(insts: &[Instruction], pc: usize, level: u32) -> Result<usize, Trap> {
    let mut pc = pc;
    let mut depth = 0;
    let mut remaining = level as usize + 1;
    loop {
        pc += 1;
        let inst = insts.get(pc).ok_or(Trap::MissingEnd)?;
        match inst {
            Instruction::Block(_) | Instruction::Loop(_) | Instruction::If(_) => depth += 1,
            Instruction::End => {
                if depth == 0 {
                    remaining -= 1;
                    if remaining == 0 {
                        return Ok(pc);
                    }
                } else {
                    depth -= 1;
                }
            }
            _ => {}
        }
    }
}

pub fn stack_unwind(stack: &mut Vec<Value>, sp: usize, arity: usize) -> Result<(), Trap> {
    if arity > 0 {
        let Some(value) = stack.pop() else {
            return Err(Trap::StackUnderflow);
        };
        stack.drain(sp..);
        stack.push(value);
    } else {
        stack.drain(sp..);
    }
    Ok(())
}
