//! Executes a `NativeModule` without an assembler.
//!
//! A small 32-bit machine model: eight registers, byte-addressed word
//! memory, the flags `cmp`/`test`/`add`/`sub` produce, and a runtime
//! that implements the intrinsics and `ref_increase` / `ref_decrease`
//! over the shared heap with reference counting switched on.
//! Runtime calls clobber `%ecx` and `%edx` the way a cdecl callee may,
//! so a missed register save shows up as a wrong result.

use crate::backends::stack::exception_ids::INDEX_OUT_OF_BOUNDS_ID;
use crate::backends::stack::instructions::StackProgram;
use crate::backends::x86::asm_entities::{
    AsmInstruction, Condition, Directive, EXCEPTION_PAYLOAD, EXCEPTION_PAYLOAD_TYPE, Label,
    NativeModule, Operand, REF_DECREASE, REF_INCREASE, Register, Section, Symbol,
    UNCAUGHT_EXCEPTION,
};
use crate::backends::x86::x86_codegen::generate_native;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::intrinsics::Intrinsic;
use crate::compiler_frontend::language::values::{TaggedValue, TypeTag};
use crate::projects::settings::ENTRY_FUNCTION_NAME;
use crate::runtime::heap::{Heap, HeapObject, RefcountReport};
use crate::runtime::intrinsic_semantics::{
    ConsoleIo, IntrinsicResult, RunOutcome, UncaughtException, call_intrinsic,
};
use crate::{eval_log, return_runtime_error};
use rustc_hash::FxHashMap;

pub const STACK_TOP: u32 = 0x00F0_0000;
const DATA_BASE: u32 = 0x0001_0000;
const HALT_ADDRESS: i32 = -1;
const CLOBBERED: i32 = 0x0BAD_0BAD;

// Values the host leaves in callee-saved registers
const HOST_REGISTERS: [(Register, i32); 3] = [
    (Register::Ebx, 0x5EED_0001),
    (Register::Esi, 0x5EED_0002),
    (Register::Edi, 0x5EED_0003),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRun {
    pub outcome: RunOutcome,
    pub refcounts: RefcountReport,
    pub exit_code: i32,
    pub steps: u64,
}

/// Generates native code for the program and runs it
pub fn run_native(
    program: &StackProgram,
    input: &[i32],
    step_limit: u64,
) -> Result<NativeRun, CompilerError> {
    let module = generate_native(program)?;
    simulate(&module, input, step_limit)
}

pub fn simulate(
    module: &NativeModule,
    input: &[i32],
    step_limit: u64,
) -> Result<NativeRun, CompilerError> {
    let mut heap = Heap::with_refcounting();
    let image = LoadedImage::load(module, &mut heap)?;

    let mut machine = Machine {
        image: &image,
        registers: [0; Register::COUNT],
        memory: image.initial_memory.iter().copied().collect(),
        flags: Flags::default(),
        heap,
        io: ConsoleIo::new(input),
        steps: 0,
        step_limit,
    };

    let exit_code = machine.run_entry()?;
    let uncaught = machine.uncaught_exception(module)?;

    Ok(NativeRun {
        refcounts: machine.heap.report(),
        outcome: RunOutcome {
            output: machine.io.output,
            uncaught,
        },
        exit_code,
        steps: machine.steps,
    })
}

/// The module laid out in memory, the way a loader would see it
struct LoadedImage {
    code: Vec<AsmInstruction>,
    functions: FxHashMap<Symbol, usize>,
    labels: FxHashMap<Label, usize>,

    // Word globals map to their address, string literals to their heap handle
    data: FxHashMap<Symbol, i32>,
    initial_memory: Vec<(u32, i32)>,
}

impl LoadedImage {
    fn load(module: &NativeModule, heap: &mut Heap) -> Result<Self, CompilerError> {
        let mut image = LoadedImage {
            code: Vec::with_capacity(module.directives.len()),
            functions: FxHashMap::default(),
            labels: FxHashMap::default(),
            data: FxHashMap::default(),
            initial_memory: Vec::new(),
        };

        let mut section = Section::Text;
        let mut pending_symbol: Option<Symbol> = None;
        let mut next_address = DATA_BASE;

        for directive in &module.directives {
            match directive {
                Directive::Section(next) => section = *next,
                Directive::Global(_) | Directive::Comment(_) => {}

                Directive::SymbolLabel(symbol) if section == Section::Text => {
                    image.functions.insert(symbol.to_owned(), image.code.len());
                }
                Directive::SymbolLabel(symbol) => pending_symbol = Some(symbol.to_owned()),

                Directive::LocalLabel(label) => {
                    image.labels.insert(label.to_owned(), image.code.len());
                }

                Directive::Instruction(instruction) => {
                    if section != Section::Text {
                        return_runtime_error!("Instruction outside .text: {:?}", instruction);
                    }
                    image.code.push(instruction.to_owned());
                }

                // String literals become heap objects, in the order they are declared
                Directive::Asciz(text) => {
                    let handle = heap.allocate(HeapObject::Text(text.as_bytes().to_vec()));
                    if let Some(symbol) = pending_symbol.take() {
                        image.data.insert(symbol, handle);
                    }
                }

                Directive::Long(value) => {
                    image.initial_memory.push((next_address, *value));
                    if let Some(symbol) = pending_symbol.take() {
                        image.data.insert(symbol, next_address as i32);
                    }
                    next_address += 4;
                }
            }
        }

        Ok(image)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    zero: bool,
    sign: bool,
    overflow: bool,
}

impl Flags {
    fn from_result(result: i32, overflow: bool) -> Self {
        Flags {
            zero: result == 0,
            sign: result < 0,
            overflow,
        }
    }

    fn holds(self, condition: Condition) -> bool {
        match condition {
            Condition::Equal => self.zero,
            Condition::NotEqual => !self.zero,
            Condition::Less => self.sign != self.overflow,
            Condition::LessOrEqual => self.zero || self.sign != self.overflow,
            Condition::Greater => !self.zero && self.sign == self.overflow,
            Condition::GreaterOrEqual => self.sign == self.overflow,
        }
    }
}

struct Machine<'m> {
    image: &'m LoadedImage,
    registers: [i32; Register::COUNT],
    memory: FxHashMap<u32, i32>,
    flags: Flags,
    heap: Heap,
    io: ConsoleIo,
    steps: u64,
    step_limit: u64,
}

impl Machine<'_> {
    // ------------------------
    //  Registers and memory
    // ------------------------
    fn register(&self, register: Register) -> i32 {
        self.registers[register.index()]
    }

    fn set_register(&mut self, register: Register, value: i32) {
        self.registers[register.index()] = value;
    }

    fn symbol_value(&self, symbol: &Symbol) -> Result<i32, CompilerError> {
        match self.image.data.get(symbol) {
            Some(value) => Ok(*value),
            None => {
                return_runtime_error!("Undefined data symbol {}", symbol);
            }
        }
    }

    fn address(&self, operand: &Operand) -> Result<u32, CompilerError> {
        match operand {
            Operand::Memory { base, offset } => {
                Ok(self.register(*base).wrapping_add(*offset) as u32)
            }
            Operand::Global(symbol) => Ok(self.symbol_value(symbol)? as u32),
            other => {
                return_runtime_error!("{:?} is not a memory operand", other);
            }
        }
    }

    fn load(&self, address: u32) -> Result<i32, CompilerError> {
        match self.memory.get(&address) {
            Some(value) => Ok(*value),
            None => {
                return_runtime_error!("Read of uninitialised memory at {:#x}", address);
            }
        }
    }

    fn store(&mut self, address: u32, value: i32) {
        self.memory.insert(address, value);
    }

    fn read(&self, operand: &Operand) -> Result<i32, CompilerError> {
        match operand {
            Operand::Immediate(value) => Ok(*value),
            Operand::Address(symbol) => self.symbol_value(symbol),
            Operand::Register(register) => Ok(self.register(*register)),
            Operand::Memory { .. } | Operand::Global(_) => self.load(self.address(operand)?),
        }
    }

    fn write(&mut self, operand: &Operand, value: i32) -> Result<(), CompilerError> {
        match operand {
            Operand::Register(register) => self.set_register(*register, value),
            Operand::Memory { .. } | Operand::Global(_) => {
                let address = self.address(operand)?;
                self.store(address, value);
            }
            other => {
                return_runtime_error!("Cannot write to {:?}", other);
            }
        }

        Ok(())
    }

    fn push(&mut self, value: i32) {
        let top = self.register(Register::Esp).wrapping_sub(4);
        self.set_register(Register::Esp, top);
        self.store(top as u32, value);
    }

    fn pop(&mut self) -> Result<i32, CompilerError> {
        let top = self.register(Register::Esp);
        let value = self.load(top as u32)?;
        self.set_register(Register::Esp, top.wrapping_add(4));
        Ok(value)
    }

    fn label(&self, label: &Label) -> Result<usize, CompilerError> {
        match self.image.labels.get(label) {
            Some(index) => Ok(*index),
            None => {
                return_runtime_error!("Jump to undefined label .L{}_{}", label.function, label.index);
            }
        }
    }

    // ------------------------
    //  Execution
    // ------------------------
    fn run_entry(&mut self) -> Result<i32, CompilerError> {
        let Some(entry) = self.image.functions.get(&Symbol::new(ENTRY_FUNCTION_NAME)).copied()
        else {
            return_runtime_error!("The module has no {} function", ENTRY_FUNCTION_NAME);
        };

        self.set_register(Register::Esp, STACK_TOP as i32);
        for (register, value) in HOST_REGISTERS {
            self.set_register(register, value);
        }
        self.push(HALT_ADDRESS);

        let mut pc = entry;
        loop {
            self.steps += 1;
            if self.steps > self.step_limit {
                return_runtime_error!("Step limit of {} reached", self.step_limit);
            }

            let image = self.image;
            let Some(instruction) = image.code.get(pc) else {
                return_runtime_error!("Execution ran past the end of the code at {}", pc);
            };

            match self.step(instruction, pc + 1)? {
                Some(next) => pc = next,
                None => break,
            }
        }

        if self.register(Register::Esp) != STACK_TOP as i32 {
            return_runtime_error!(
                "{} returned with %esp at {:#x} instead of {:#x}",
                ENTRY_FUNCTION_NAME,
                self.register(Register::Esp),
                STACK_TOP
            );
        }
        for (register, value) in HOST_REGISTERS {
            if self.register(register) != value {
                return_runtime_error!(
                    "{} did not preserve the host's %{}",
                    ENTRY_FUNCTION_NAME,
                    register.name()
                );
            }
        }

        Ok(self.register(Register::Eax))
    }

    /// Runs one instruction, returning the next pc or None once the host is returned to
    fn step(&mut self, instruction: &AsmInstruction, next: usize) -> Result<Option<usize>, CompilerError> {
        match instruction {
            AsmInstruction::Mov(source, destination) => {
                let value = self.read(source)?;
                self.write(destination, value)?;
            }

            AsmInstruction::Movzbl(byte, register) => {
                let value = self.register(byte.full()) & 0xff;
                self.set_register(*register, value);
            }

            AsmInstruction::Add(source, destination) => {
                let (result, overflow) = self.read(destination)?.overflowing_add(self.read(source)?);
                self.write(destination, result)?;
                self.flags = Flags::from_result(result, overflow);
            }

            AsmInstruction::Sub(source, destination) => {
                let (result, overflow) = self.read(destination)?.overflowing_sub(self.read(source)?);
                self.write(destination, result)?;
                self.flags = Flags::from_result(result, overflow);
            }

            AsmInstruction::Imul(source, register) => {
                let result = self.register(*register).wrapping_mul(self.read(source)?);
                self.set_register(*register, result);
            }

            AsmInstruction::And(source, destination) => {
                let result = self.read(destination)? & self.read(source)?;
                self.write(destination, result)?;
                self.flags = Flags::from_result(result, false);
            }

            AsmInstruction::Or(source, destination) => {
                let result = self.read(destination)? | self.read(source)?;
                self.write(destination, result)?;
                self.flags = Flags::from_result(result, false);
            }

            AsmInstruction::Cmp(source, destination) => {
                let (result, overflow) = self.read(destination)?.overflowing_sub(self.read(source)?);
                self.flags = Flags::from_result(result, overflow);
            }

            AsmInstruction::Test(source, destination) => {
                let result = self.read(destination)? & self.read(source)?;
                self.flags = Flags::from_result(result, false);
            }

            AsmInstruction::Set(condition, byte) => {
                let full = byte.full();
                let value = (self.register(full) & !0xff) | i32::from(self.flags.holds(*condition));
                self.set_register(full, value);
            }

            AsmInstruction::Cltd => {
                let sign = if self.register(Register::Eax) < 0 { -1 } else { 0 };
                self.set_register(Register::Edx, sign);
            }

            AsmInstruction::Idiv(divisor) => self.divide(divisor)?,

            AsmInstruction::Push(operand) => {
                let value = self.read(operand)?;
                self.push(value);
            }

            AsmInstruction::Pop(operand) => {
                let value = self.pop()?;
                self.write(operand, value)?;
            }

            AsmInstruction::Call(symbol) => {
                if let Some(target) = self.image.functions.get(symbol).copied() {
                    self.push(next as i32);
                    return Ok(Some(target));
                }
                self.call_runtime(symbol)?;
            }

            AsmInstruction::Jmp(label) => return Ok(Some(self.label(label)?)),

            AsmInstruction::Jcc(condition, label) => {
                if self.flags.holds(*condition) {
                    return Ok(Some(self.label(label)?));
                }
            }

            AsmInstruction::Ret => {
                let address = self.pop()?;
                if address == HALT_ADDRESS {
                    return Ok(None);
                }

                match usize::try_from(address) {
                    Ok(address) if address < self.image.code.len() => return Ok(Some(address)),
                    _ => {
                        return_runtime_error!("ret to {:#x}, which is not a return address", address);
                    }
                }
            }
        }

        Ok(Some(next))
    }

    fn divide(&mut self, divisor: &Operand) -> Result<(), CompilerError> {
        let divisor = i64::from(self.read(divisor)?);
        let dividend = (i64::from(self.register(Register::Edx)) << 32)
            | i64::from(self.register(Register::Eax) as u32);

        if divisor == 0 {
            return_runtime_error!("Arithmetic fault: division by zero");
        }

        let quotient = dividend / divisor;
        let Ok(quotient) = i32::try_from(quotient) else {
            return_runtime_error!("Arithmetic fault: {} / {} overflows", dividend, divisor);
        };

        self.set_register(Register::Eax, quotient);
        self.set_register(Register::Edx, (dividend % divisor) as i32);
        Ok(())
    }

    // ------------------------
    //  Runtime entry points
    // ------------------------

    /// Arguments start at the top of the stack, no return address is pushed
    fn argument(&self, base: u32, index: usize) -> Result<TaggedValue, CompilerError> {
        let address = base.wrapping_add(8 * index as u32);
        let value = self.load(address)?;
        let code = self.load(address.wrapping_add(4))?;

        match TypeTag::from_code(code) {
            Some(tag) => Ok(TaggedValue::new(value, tag)),
            None => {
                return_runtime_error!("Invalid type tag {} for argument {} ({})", code, index, value);
            }
        }
    }

    fn call_runtime(&mut self, symbol: &Symbol) -> Result<(), CompilerError> {
        let base = self.register(Register::Esp) as u32;

        match symbol.as_str() {
            REF_INCREASE => {
                let value = self.argument(base, 0)?;
                self.heap.retain(value)?;
            }

            REF_DECREASE => {
                let value = self.argument(base, 0)?;
                self.heap.release(value)?;
            }

            name => {
                let Some(intrinsic) = Intrinsic::ALL
                    .into_iter()
                    .find(|intrinsic| intrinsic.native_symbol() == name)
                else {
                    return_runtime_error!("Call to undefined symbol {}", name);
                };

                let arguments = (0..intrinsic.arity())
                    .map(|index| self.argument(base, index))
                    .collect::<Result<Vec<_>, _>>()?;

                eval_log!(Blue "native call {} {:?}", name, arguments);

                match call_intrinsic(intrinsic, &arguments, &mut self.heap, &mut self.io)? {
                    IntrinsicResult::Returned(value) => {
                        self.set_register(Register::Eax, value.value);
                        self.set_register(Register::Ebx, value.tag.code());
                    }

                    // The caller reserved the thrown slot just above the arguments
                    IntrinsicResult::OutOfBounds(index) => {
                        let thrown_slot = base.wrapping_add(8 * intrinsic.arity() as u32);
                        self.store(thrown_slot, INDEX_OUT_OF_BOUNDS_ID);

                        let payload = self.symbol_value(&Symbol::new(EXCEPTION_PAYLOAD))?;
                        let payload_type = self.symbol_value(&Symbol::new(EXCEPTION_PAYLOAD_TYPE))?;
                        self.store(payload as u32, index);
                        self.store(payload_type as u32, TypeTag::Scalar.code());

                        self.set_register(Register::Eax, 0);
                        self.set_register(Register::Ebx, 0);
                    }
                }
            }
        }

        self.set_register(Register::Ecx, CLOBBERED);
        self.set_register(Register::Edx, CLOBBERED);
        Ok(())
    }

    fn uncaught_exception(&self, module: &NativeModule) -> Result<Option<UncaughtException>, CompilerError> {
        let Some(address) = self.image.data.get(&Symbol::new(UNCAUGHT_EXCEPTION)) else {
            return Ok(None);
        };

        let id = self.load(*address as u32)?;
        if id == 0 {
            return Ok(None);
        }

        let payload = self.load(self.symbol_value(&Symbol::new(EXCEPTION_PAYLOAD))? as u32)?;
        Ok(Some(UncaughtException {
            id,
            name: module.exception_name(id).unwrap_or_default().to_owned(),
            payload,
        }))
    }
}

#[cfg(test)]
#[path = "tests/asm_simulator_tests.rs"]
mod tests;
