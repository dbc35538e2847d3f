//! Prints a `NativeModule` as GNU `as` input in AT&T syntax.

use crate::backends::x86::asm_entities::{
    AsmInstruction, Directive, Label, NativeModule, Operand, Section, Symbol,
};
use crate::projects::settings::TargetPlatform;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub platform: TargetPlatform,
    pub comments: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            platform: TargetPlatform::Unix,
            comments: true,
        }
    }
}

pub fn render_module(module: &NativeModule, options: &RenderOptions) -> String {
    let renderer = Renderer { options };
    let mut text = String::with_capacity(module.directives.len() * 20);

    if options.comments {
        for (index, name) in module.exception_names.iter().enumerate() {
            let _ = writeln!(text, "# exception {} = {}", index + 1, name);
        }
    }

    for directive in &module.directives {
        renderer.directive(directive, &mut text);
    }

    text
}

struct Renderer<'a> {
    options: &'a RenderOptions,
}

impl Renderer<'_> {
    fn symbol(&self, symbol: &Symbol) -> String {
        match self.options.platform {
            TargetPlatform::Unix => symbol.to_string(),
            TargetPlatform::Windows => format!("_{symbol}"),
        }
    }

    // Local labels never get the platform prefix
    fn label(&self, label: &Label) -> String {
        format!(".L{}_{}", label.function, label.index)
    }

    fn operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Immediate(value) => format!("${value}"),
            Operand::Address(symbol) => format!("${}", self.symbol(symbol)),
            Operand::Register(register) => format!("%{}", register.name()),
            Operand::Memory { base, offset: 0 } => format!("(%{})", base.name()),
            Operand::Memory { base, offset } => format!("{}(%{})", offset, base.name()),
            Operand::Global(symbol) => self.symbol(symbol),
        }
    }

    fn two(&self, mnemonic: &str, source: &Operand, destination: &Operand) -> String {
        format!(
            "{mnemonic} {}, {}",
            self.operand(source),
            self.operand(destination)
        )
    }

    fn instruction(&self, instruction: &AsmInstruction) -> String {
        match instruction {
            AsmInstruction::Mov(source, destination) => self.two("movl", source, destination),
            AsmInstruction::Movzbl(byte, register) => {
                format!("movzbl %{}, %{}", byte.name(), register.name())
            }
            AsmInstruction::Add(source, destination) => self.two("addl", source, destination),
            AsmInstruction::Sub(source, destination) => self.two("subl", source, destination),
            AsmInstruction::Imul(source, register) => {
                format!("imull {}, %{}", self.operand(source), register.name())
            }
            AsmInstruction::And(source, destination) => self.two("andl", source, destination),
            AsmInstruction::Or(source, destination) => self.two("orl", source, destination),
            AsmInstruction::Cmp(source, destination) => self.two("cmpl", source, destination),
            AsmInstruction::Test(source, destination) => self.two("testl", source, destination),
            AsmInstruction::Set(condition, byte) => {
                format!("set{} %{}", condition.suffix(), byte.name())
            }
            AsmInstruction::Cltd => String::from("cltd"),
            AsmInstruction::Idiv(divisor) => format!("idivl {}", self.operand(divisor)),
            AsmInstruction::Push(operand) => format!("pushl {}", self.operand(operand)),
            AsmInstruction::Pop(operand) => format!("popl {}", self.operand(operand)),
            AsmInstruction::Call(symbol) => format!("call {}", self.symbol(symbol)),
            AsmInstruction::Jmp(label) => format!("jmp {}", self.label(label)),
            AsmInstruction::Jcc(condition, label) => {
                format!("j{} {}", condition.suffix(), self.label(label))
            }
            AsmInstruction::Ret => String::from("ret"),
        }
    }

    fn directive(&self, directive: &Directive, text: &mut String) {
        let _ = match directive {
            Directive::Section(Section::Text) => writeln!(text, "    .text"),
            Directive::Section(Section::ReadOnlyData) => writeln!(text, "    .section .rodata"),
            Directive::Section(Section::Data) => writeln!(text, "    .data"),
            Directive::Global(symbol) => writeln!(text, "    .globl {}", self.symbol(symbol)),
            Directive::SymbolLabel(symbol) => writeln!(text, "{}:", self.symbol(symbol)),
            Directive::LocalLabel(label) => writeln!(text, "{}:", self.label(label)),
            Directive::Asciz(literal) => writeln!(text, "    .asciz \"{}\"", escape(literal)),
            Directive::Long(value) => writeln!(text, "    .long {value}"),
            Directive::Comment(comment) if self.options.comments => {
                writeln!(text, "    # {comment}")
            }
            Directive::Comment(_) => Ok(()),
            Directive::Instruction(instruction) => {
                writeln!(text, "    {}", self.instruction(instruction))
            }
        };
    }
}

/// Escapes a string literal for `.asciz`
pub fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());

    for byte in literal.bytes() {
        match byte {
            b'"' => escaped.push_str("\\\""),
            b'\\' => escaped.push_str("\\\\"),
            b'\n' => escaped.push_str("\\n"),
            b'\t' => escaped.push_str("\\t"),
            0x20..=0x7e => escaped.push(byte as char),
            other => {
                let _ = write!(escaped, "\\{other:03o}");
            }
        }
    }

    escaped
}

#[cfg(test)]
#[path = "tests/asm_rendering_tests.rs"]
mod tests;
