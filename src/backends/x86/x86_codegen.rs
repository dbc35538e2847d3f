//! ============================================================
//!                   StackProgram → x86 (32-bit)
//! ============================================================
//! Each function is lowered on its own with a symbolic model of the
//! operand stack (see `symbolic_stack`). Values travel as (value, tag)
//! pairs; every place ownership of an array reference changes emits the
//! matching `ref_increase` / `ref_decrease` call.
//!
//! Exceptions follow the bytecode exactly: a can-throw callee gets a zero
//! thrown slot pushed by its caller, `TransEx` fills it in, and the
//! caller pops it into `$thrown` for the compiled post-call check.

use crate::backends::stack::instructions::{
    CallTarget, Instruction, StackFunction, StackProgram, StackVariable,
};
use crate::backends::x86::asm_entities::{
    AsmInstruction, ByteRegister, Condition, Directive, EXCEPTION_PAYLOAD, EXCEPTION_PAYLOAD_TYPE,
    Label, NativeModule, Operand, REF_DECREASE, REF_INCREASE, Register, Section, Symbol,
    UNCAUGHT_EXCEPTION,
};
use crate::backends::x86::frame_layout::{FrameLayout, SLOT_SIZE};
use crate::backends::x86::symbolic_stack::{
    SlotLocation, SymbolicSlot, SymbolicStack, registers_in_use,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::{BinaryOperator, UnaryOperator};
use crate::compiler_frontend::language::intrinsics::ResultTag;
use crate::{codegen_log, return_codegen_error};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

pub fn generate_native(program: &StackProgram) -> Result<NativeModule, CompilerError> {
    if program.entry_function().is_none() {
        return_codegen_error!("Entry function {} was never compiled", program.entry);
    }

    let bodies = program
        .functions
        .par_iter()
        .map(|function| FunctionGenerator::new(program, function).generate())
        .collect::<Result<Vec<_>, CompilerError>>()?;

    let mut directives = vec![Directive::Section(Section::Text)];
    for body in bodies {
        directives.extend(body);
    }

    if !program.literal_pool.is_empty() {
        directives.push(Directive::Section(Section::ReadOnlyData));
        for (index, literal) in program.literal_pool.iter().enumerate() {
            directives.push(Directive::SymbolLabel(Symbol::pooled_string(index)));
            directives.push(Directive::Asciz(literal.to_owned()));
        }
    }

    directives.push(Directive::Section(Section::Data));
    for global in [EXCEPTION_PAYLOAD, EXCEPTION_PAYLOAD_TYPE, UNCAUGHT_EXCEPTION] {
        let symbol = Symbol::new(global);
        directives.push(Directive::Global(symbol.clone()));
        directives.push(Directive::SymbolLabel(symbol));
        directives.push(Directive::Long(0));
    }

    Ok(NativeModule {
        directives,
        exception_names: program.exception_names.to_owned(),
    })
}

struct FunctionGenerator<'a> {
    program: &'a StackProgram,
    function: &'a StackFunction,
    symbol: Symbol,
    is_entry: bool,
    layout: FrameLayout,

    stack: SymbolicStack,

    // False right after Jmp / Ret, until a merge point gives the state back
    reachable: bool,

    merge_points: FxHashMap<usize, SymbolicStack>,
    jump_targets: FxHashSet<usize>,
    code: Vec<Directive>,
}

impl<'a> FunctionGenerator<'a> {
    fn new(program: &'a StackProgram, function: &'a StackFunction) -> Self {
        FunctionGenerator {
            program,
            function,
            symbol: Symbol::for_function(&function.key, &program.entry),
            is_entry: function.key == program.entry,
            layout: FrameLayout::of(function, program),
            stack: SymbolicStack::new(),
            reachable: true,
            merge_points: FxHashMap::default(),
            jump_targets: FxHashSet::default(),
            code: Vec::with_capacity(function.instructions.len() * 8),
        }
    }

    fn generate(mut self) -> Result<Vec<Directive>, CompilerError> {
        self.collect_jump_targets()?;

        self.code.push(Directive::Global(self.symbol.clone()));
        self.code.push(Directive::SymbolLabel(self.symbol.clone()));
        self.emit_prologue();

        let function = self.function;
        for (index, instruction) in function.instructions.iter().enumerate() {
            self.arrive(index)?;

            if self.jump_targets.contains(&index) {
                let label = self.label(index);
                self.code.push(Directive::LocalLabel(label));
            }
            self.code
                .push(Directive::Comment(format!("{index}: {instruction}")));

            self.lower(index, instruction)?;

            codegen_log!(Dark Cyan "{} {:>4}: {} -> {}", self.symbol, index, instruction.to_string(), self.stack);
        }

        if self.reachable {
            return_codegen_error!(
                "{} can run past its last instruction without returning",
                function.key
            );
        }

        Ok(self.code)
    }

    /// Every jump must land inside the function
    fn collect_jump_targets(&mut self) -> Result<(), CompilerError> {
        let length = self.function.instructions.len();

        for (index, instruction) in self.function.instructions.iter().enumerate() {
            if let Some(target) = instruction.jump_target() {
                if target >= length {
                    return_codegen_error!(
                        "{} at {} in {} targets {}, but the function has {} instructions",
                        instruction,
                        index,
                        self.function.key,
                        target,
                        length;
                        { CompilationStage => "Native Codegen", InstructionKind => "jump" }
                    );
                }
                self.jump_targets.insert(target);
            }
        }

        Ok(())
    }

    fn label(&self, index: usize) -> Label {
        Label {
            function: self.symbol.clone(),
            index,
        }
    }

    // ------------------------
    //  Merge points
    // ------------------------
    fn arrive(&mut self, index: usize) -> Result<(), CompilerError> {
        if self.jump_targets.contains(&index) {
            match self.merge_points.get(&index) {
                Some(recorded) if self.reachable => {
                    if recorded != &self.stack {
                        return_codegen_error!(
                            "Symbolic stack mismatch at instruction {} of {}: {} recorded by a jump, {} falling through",
                            index,
                            self.function.key,
                            recorded,
                            self.stack;
                            { CompilationStage => "Native Codegen", InstructionKind => "merge point" }
                        );
                    }
                }
                Some(recorded) => self.stack = recorded.to_owned(),
                None => {
                    // Only reachable by a backward jump not emitted yet
                    if !self.reachable {
                        self.stack = SymbolicStack::new();
                    }
                    self.merge_points.insert(index, self.stack.to_owned());
                }
            }
        } else if !self.reachable {
            self.stack = SymbolicStack::new();
        }

        self.reachable = true;
        Ok(())
    }

    fn record_jump(&mut self, target: usize, origin: usize) -> Result<(), CompilerError> {
        match self.merge_points.get(&target) {
            Some(recorded) => {
                if recorded != &self.stack {
                    return_codegen_error!(
                        "Symbolic stack mismatch at instruction {} of {}: {} recorded, {} arriving from the jump at {}",
                        target,
                        self.function.key,
                        recorded,
                        self.stack,
                        origin;
                        { CompilationStage => "Native Codegen", InstructionKind => "merge point" }
                    );
                }
            }
            None => {
                self.merge_points.insert(target, self.stack.to_owned());
            }
        }

        Ok(())
    }

    // ------------------------
    //  Emission helpers
    // ------------------------
    fn emit(&mut self, instruction: AsmInstruction) {
        self.code.push(Directive::Instruction(instruction));
    }

    fn slot_operands(&self, slot: SymbolicSlot) -> (Operand, Operand) {
        match slot.location {
            SlotLocation::Register(pair) => (pair.value().into(), pair.tag().into()),
            SlotLocation::Spilled(index) => self.layout.spill(index),
        }
    }

    /// x86 has no memory-to-memory move, so those go through %eax
    fn move_word(&mut self, source: Operand, destination: Operand) {
        if source.is_memory() && destination.is_memory() {
            self.emit(AsmInstruction::Mov(source, Register::Eax.into()));
            self.emit(AsmInstruction::Mov(Register::Eax.into(), destination));
        } else {
            self.emit(AsmInstruction::Mov(source, destination));
        }
    }

    fn push_value(&mut self, value: Operand, tag: Operand, owned: bool) {
        let slot = self.stack.push(owned);
        match slot.location {
            SlotLocation::Register(pair) => {
                self.emit(AsmInstruction::Mov(value, pair.value().into()));
                self.emit(AsmInstruction::Mov(tag, pair.tag().into()));
            }
            SlotLocation::Spilled(_) => {
                self.emit(AsmInstruction::Push(tag));
                self.emit(AsmInstruction::Push(value));
            }
        }
    }

    fn drop_machine_slots(&mut self, count: usize) {
        if count > 0 {
            self.emit(AsmInstruction::Add(
                Operand::Immediate(SLOT_SIZE * count as i32),
                Register::Esp.into(),
            ));
        }
    }

    fn drop_spilled(&mut self, slots: &[SymbolicSlot]) {
        let spilled = slots
            .iter()
            .filter(|slot| slot.location.is_spilled())
            .count();
        self.drop_machine_slots(spilled);
    }

    /// Calls a runtime entry point, keeping the register pairs of the
    /// `live` bottom-most symbolic slots intact
    fn runtime_call(&mut self, symbol: &str, arguments: &[(Operand, Operand)], live: usize) {
        let saved = registers_in_use(live);

        for pair in saved {
            self.emit(AsmInstruction::Push(pair.value().into()));
            self.emit(AsmInstruction::Push(pair.tag().into()));
        }
        for (value, tag) in arguments.iter().rev() {
            self.emit(AsmInstruction::Push(tag.to_owned()));
            self.emit(AsmInstruction::Push(value.to_owned()));
        }

        self.emit(AsmInstruction::Call(Symbol::new(symbol)));
        self.drop_machine_slots(arguments.len());

        for pair in saved.iter().rev() {
            self.emit(AsmInstruction::Pop(pair.tag().into()));
            self.emit(AsmInstruction::Pop(pair.value().into()));
        }
    }

    fn retain(&mut self, operands: (Operand, Operand), live: usize) {
        self.runtime_call(REF_INCREASE, &[operands], live);
    }

    fn release(&mut self, operands: (Operand, Operand), live: usize) {
        self.runtime_call(REF_DECREASE, &[operands], live);
    }

    /// Releases consumed owned slots while %eax holds a result
    fn release_owned_keeping_eax(&mut self, slots: &[SymbolicSlot], live: usize) {
        if !slots.iter().any(|slot| slot.owned) {
            return;
        }

        self.emit(AsmInstruction::Push(Register::Eax.into()));
        for slot in slots.iter().rev().filter(|slot| slot.owned) {
            let operands = self.slot_operands(*slot);
            self.release(operands, live);
        }
        self.emit(AsmInstruction::Pop(Register::Eax.into()));
    }

    /// Turns any nonzero value into 1 through the low byte of a scratch register
    fn normalise_boolean(&mut self, value: Operand, byte: ByteRegister) {
        let full = byte.full();
        self.emit(AsmInstruction::Mov(value, full.into()));
        self.emit(AsmInstruction::Cmp(Operand::Immediate(0), full.into()));
        self.emit(AsmInstruction::Set(Condition::NotEqual, byte));
        self.emit(AsmInstruction::Movzbl(byte, full));
    }

    // ------------------------
    //  Prologue / epilogue
    // ------------------------
    fn emit_prologue(&mut self) {
        // The entry function is called by the host and keeps its callee-saved registers
        if self.is_entry {
            for register in [Register::Ebx, Register::Esi, Register::Edi] {
                self.emit(AsmInstruction::Push(register.into()));
            }
        }

        self.emit(AsmInstruction::Push(Register::Ebp.into()));
        self.emit(AsmInstruction::Mov(Register::Esp.into(), Register::Ebp.into()));

        let locals_size = self.layout.locals_size();
        if locals_size > 0 {
            self.emit(AsmInstruction::Sub(
                Operand::Immediate(locals_size),
                Register::Esp.into(),
            ));
        }

        let words: Vec<Operand> = self.layout.local_words().collect();
        for word in words {
            self.emit(AsmInstruction::Mov(Operand::Immediate(0), word));
        }

        // The callee holds its own reference to every argument
        let parameters: Vec<(Operand, Operand)> = self.layout.parameters().collect();
        for parameter in parameters {
            self.retain(parameter, 0);
        }
    }

    fn emit_return(&mut self, result_in_eax: bool) {
        let swept = self.layout.swept_variables();
        let park = result_in_eax && !swept.is_empty();

        if park {
            self.emit(AsmInstruction::Push(Register::Ebx.into()));
            self.emit(AsmInstruction::Push(Register::Eax.into()));
        }
        for variable in swept {
            self.release(variable, 0);
        }
        if park {
            self.emit(AsmInstruction::Pop(Register::Eax.into()));
            self.emit(AsmInstruction::Pop(Register::Ebx.into()));
        }

        if !result_in_eax {
            self.emit(AsmInstruction::Mov(Operand::Immediate(0), Register::Eax.into()));
            self.emit(AsmInstruction::Mov(Operand::Immediate(0), Register::Ebx.into()));
        }

        // The host sees exit code 0 whatever main returned
        if self.is_entry && result_in_eax {
            self.emit(AsmInstruction::Mov(Operand::Immediate(0), Register::Eax.into()));
        }

        self.emit(AsmInstruction::Mov(Register::Ebp.into(), Register::Esp.into()));
        self.emit(AsmInstruction::Pop(Register::Ebp.into()));

        if self.is_entry {
            for register in [Register::Edi, Register::Esi, Register::Ebx] {
                self.emit(AsmInstruction::Pop(register.into()));
            }
        }

        self.emit(AsmInstruction::Ret);
        self.reachable = false;
    }

    // ------------------------
    //  Instructions
    // ------------------------
    fn lower(&mut self, index: usize, instruction: &Instruction) -> Result<(), CompilerError> {
        match instruction {
            Instruction::Push(value) => {
                self.push_value(Operand::Immediate(*value), Operand::Immediate(0), false);
            }

            Instruction::PushPooled(pool_index) => {
                if *pool_index >= self.program.literal_pool.len() {
                    return_codegen_error!(
                        "PushPooled at {} in {} refers to literal #{}, the pool has {}",
                        index,
                        self.function.key,
                        pool_index,
                        self.program.literal_pool.len()
                    );
                }

                self.push_value(
                    Operand::Address(Symbol::pooled_string(*pool_index)),
                    Operand::Immediate(0),
                    false,
                );
            }

            Instruction::Ld(variable) => {
                let (value, tag) = self.layout.operands(variable)?;
                self.push_value(value, tag, *variable == StackVariable::ThrownData);
            }

            Instruction::St(variable) => self.lower_store(variable)?,

            Instruction::Pop => {
                let live = self.stack.depth();
                let slot = self.stack.pop("Pop")?;
                if slot.owned {
                    let operands = self.slot_operands(slot);
                    self.release(operands, live);
                }
                self.drop_spilled(&[slot]);
            }

            Instruction::Unop(UnaryOperator::Not) => {
                let live = self.stack.depth();
                let operand = self.stack.pop("Unop !")?;
                let (value, _) = self.slot_operands(operand);

                self.emit(AsmInstruction::Mov(value, Register::Eax.into()));
                self.emit(AsmInstruction::Cmp(Operand::Immediate(0), Register::Eax.into()));
                self.emit(AsmInstruction::Set(Condition::Equal, ByteRegister::Al));
                self.emit(AsmInstruction::Movzbl(ByteRegister::Al, Register::Eax));

                self.release_owned_keeping_eax(&[operand], live);
                self.drop_spilled(&[operand]);
                self.push_value(Register::Eax.into(), Operand::Immediate(0), false);
            }

            Instruction::Binop(operator) => self.lower_binary(*operator)?,

            Instruction::Jz(target) => {
                let live = self.stack.depth();
                let condition = self.stack.pop("Jz")?;
                let (value, _) = self.slot_operands(condition);

                self.emit(AsmInstruction::Mov(value, Register::Eax.into()));
                self.release_owned_keeping_eax(&[condition], live);
                self.drop_spilled(&[condition]);

                // Flags must come from the condition, after any stack adjustment
                self.emit(AsmInstruction::Test(
                    Register::Eax.into(),
                    Register::Eax.into(),
                ));
                self.record_jump(*target, index)?;
                let label = self.label(*target);
                self.emit(AsmInstruction::Jcc(Condition::Equal, label));
            }

            Instruction::Jmp(target) => {
                self.record_jump(*target, index)?;
                let label = self.label(*target);
                self.emit(AsmInstruction::Jmp(label));
                self.reachable = false;
            }

            Instruction::Call(target) => self.lower_call(target)?,

            Instruction::Ret1 => {
                let slot = self.stack.pop("Ret1")?;
                let (value, tag) = self.slot_operands(slot);
                self.emit(AsmInstruction::Mov(value, Register::Eax.into()));
                self.emit(AsmInstruction::Mov(tag, Register::Ebx.into()));
                self.drop_spilled(&[slot]);
                self.emit_return(true);
            }

            Instruction::Ret0 => self.emit_return(false),

            Instruction::TransEx => self.lower_transfer()?,
        }

        Ok(())
    }

    /// Decrement the old value, store, increment the new one.
    /// An owned operand hands its reference over with one more decrement.
    fn lower_store(&mut self, variable: &StackVariable) -> Result<(), CompilerError> {
        let live = self.stack.depth();
        let slot = self.stack.pop("St")?;
        let (value, tag) = self.slot_operands(slot);
        let (home_value, home_tag) = self.layout.operands(variable)?;

        if variable.is_scalar_only() {
            self.move_word(value, home_value);
            self.move_word(tag, home_tag);
        } else {
            let home = (home_value.to_owned(), home_tag.to_owned());
            self.release(home.to_owned(), live);
            self.move_word(value, home_value);
            self.move_word(tag, home_tag);
            self.retain(home.to_owned(), live);
            if slot.owned {
                self.release(home, live);
            }
        }

        self.drop_spilled(&[slot]);
        Ok(())
    }

    fn lower_binary(&mut self, operator: BinaryOperator) -> Result<(), CompilerError> {
        let live = self.stack.depth();
        let origin = format!("Binop {}", operator.symbol());
        let operands = self.stack.pop_many(2, &origin)?;
        let (left, _) = self.slot_operands(operands[0]);
        let (right, _) = self.slot_operands(operands[1]);

        match operator {
            BinaryOperator::Plus => {
                self.emit(AsmInstruction::Mov(left, Register::Eax.into()));
                self.emit(AsmInstruction::Add(right, Register::Eax.into()));
            }
            BinaryOperator::Minus => {
                self.emit(AsmInstruction::Mov(left, Register::Eax.into()));
                self.emit(AsmInstruction::Sub(right, Register::Eax.into()));
            }
            BinaryOperator::Times => {
                self.emit(AsmInstruction::Mov(left, Register::Eax.into()));
                self.emit(AsmInstruction::Imul(right, Register::Eax));
            }

            // idiv takes %edx:%eax, and %edx is the tag register of R0
            BinaryOperator::Div | BinaryOperator::Rem => {
                self.emit(AsmInstruction::Mov(right, Register::Ebx.into()));
                self.emit(AsmInstruction::Mov(left, Register::Eax.into()));
                self.emit(AsmInstruction::Push(Register::Edx.into()));
                self.emit(AsmInstruction::Cltd);
                self.emit(AsmInstruction::Idiv(Register::Ebx.into()));
                if operator == BinaryOperator::Rem {
                    self.emit(AsmInstruction::Mov(Register::Edx.into(), Register::Eax.into()));
                }
                self.emit(AsmInstruction::Pop(Register::Edx.into()));
            }

            BinaryOperator::And | BinaryOperator::Or => {
                self.normalise_boolean(left, ByteRegister::Al);
                self.normalise_boolean(right, ByteRegister::Bl);
                let combined = match operator {
                    BinaryOperator::And => {
                        AsmInstruction::And(Register::Ebx.into(), Register::Eax.into())
                    }
                    _ => AsmInstruction::Or(Register::Ebx.into(), Register::Eax.into()),
                };
                self.emit(combined);
            }

            comparison => {
                let Some(condition) = Condition::for_comparison(comparison) else {
                    return_codegen_error!("No condition code for {}", comparison.symbol());
                };
                self.emit(AsmInstruction::Mov(left, Register::Eax.into()));
                self.emit(AsmInstruction::Cmp(right, Register::Eax.into()));
                self.emit(AsmInstruction::Set(condition, ByteRegister::Al));
                self.emit(AsmInstruction::Movzbl(ByteRegister::Al, Register::Eax));
            }
        }

        self.release_owned_keeping_eax(&operands, live);
        self.drop_spilled(&operands);
        self.push_value(Register::Eax.into(), Operand::Immediate(0), false);
        Ok(())
    }

    fn lower_call(&mut self, target: &CallTarget) -> Result<(), CompilerError> {
        let symbol = match target {
            CallTarget::User(key) => {
                if self.program.function(key).is_none() {
                    return_codegen_error!("Call to {} which was never compiled", key);
                }
                Symbol::for_function(key, &self.program.entry)
            }
            CallTarget::Intrinsic(intrinsic) => Symbol::new(intrinsic.native_symbol()),
        };

        let live = self.stack.depth();
        let arity = target.arity();
        let can_throw = self.program.can_throw(target);
        let arguments = self.stack.pop_many(arity, &format!("Call {target}"))?;
        let saved = registers_in_use(live);

        for pair in saved {
            self.emit(AsmInstruction::Push(pair.value().into()));
            self.emit(AsmInstruction::Push(pair.tag().into()));
        }
        if can_throw {
            self.emit(AsmInstruction::Push(Operand::Immediate(0)));
        }

        // Copies, last argument first, so the callee sees them in declaration order
        for argument in arguments.iter().rev() {
            let (value, tag) = self.slot_operands(*argument);
            self.emit(AsmInstruction::Push(tag));
            self.emit(AsmInstruction::Push(value));
        }

        self.emit(AsmInstruction::Call(symbol));

        if let CallTarget::Intrinsic(intrinsic) = target {
            if let ResultTag::Static(tag) = intrinsic.result_tag() {
                self.emit(AsmInstruction::Mov(
                    Operand::Immediate(tag.code()),
                    Register::Ebx.into(),
                ));
            }
        }

        self.drop_machine_slots(arity);
        if can_throw {
            let (thrown, _) = self.layout.operands(&StackVariable::Thrown)?;
            self.emit(AsmInstruction::Pop(thrown));
        }
        for pair in saved.iter().rev() {
            self.emit(AsmInstruction::Pop(pair.tag().into()));
            self.emit(AsmInstruction::Pop(pair.value().into()));
        }

        // Before the arguments are released, the array may be their only owner
        let retained = matches!(target, CallTarget::Intrinsic(intrinsic) if intrinsic.retains_result());
        if retained {
            self.emit(AsmInstruction::Push(Register::Ebx.into()));
            self.emit(AsmInstruction::Push(Register::Eax.into()));
            self.retain((Register::Eax.into(), Register::Ebx.into()), live);
            self.emit(AsmInstruction::Pop(Register::Eax.into()));
            self.emit(AsmInstruction::Pop(Register::Ebx.into()));
        }

        // The arguments are back in their slots, release the owned ones
        if arguments.iter().any(|argument| argument.owned) {
            self.emit(AsmInstruction::Push(Register::Ebx.into()));
            self.emit(AsmInstruction::Push(Register::Eax.into()));
            for argument in arguments.iter().rev().filter(|argument| argument.owned) {
                let operands = self.slot_operands(*argument);
                self.release(operands, live);
            }
            self.emit(AsmInstruction::Pop(Register::Eax.into()));
            self.emit(AsmInstruction::Pop(Register::Ebx.into()));
        }

        self.drop_spilled(&arguments);

        let owned = match target {
            CallTarget::User(_) => true,
            CallTarget::Intrinsic(intrinsic) => intrinsic.returns_owned() || retained,
        };
        self.push_value(Register::Eax.into(), Register::Ebx.into(), owned);
        Ok(())
    }

    /// Hands `$ex` / `$exdata` to the caller. The entry function has no
    /// caller, so the id goes to `uncaught_exception` instead.
    fn lower_transfer(&mut self) -> Result<(), CompilerError> {
        let destination = if self.is_entry {
            Operand::global(UNCAUGHT_EXCEPTION)
        } else if self.function.can_throw {
            self.layout.thrown_slot()
        } else {
            // No caller reserves a thrown slot for this function
            self.code.push(Directive::Comment(String::from(
                "unreachable: this function cannot throw",
            )));
            return Ok(());
        };

        let (exception, _) = self.layout.operands(&StackVariable::CurrentException)?;
        let (payload, payload_tag) = self.layout.operands(&StackVariable::ExceptionData)?;

        self.move_word(exception, destination);
        self.move_word(payload, Operand::global(EXCEPTION_PAYLOAD));
        self.move_word(payload_tag, Operand::global(EXCEPTION_PAYLOAD_TYPE));
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/x86_codegen_tests.rs"]
mod tests;
