#![cfg(test)]

use crate::backends::x86::asm_entities::{
    AsmInstruction, ByteRegister, Condition, Directive, Label, NativeModule, Operand, Register,
    Section, Symbol,
};
use crate::backends::x86::asm_rendering::{RenderOptions, escape, render_module};
use crate::projects::settings::TargetPlatform;

fn sample_module() -> NativeModule {
    let main = Symbol::new("main");
    let label = Label {
        function: main.clone(),
        index: 3,
    };

    NativeModule {
        directives: vec![
            Directive::Section(Section::Text),
            Directive::Global(main.clone()),
            Directive::SymbolLabel(main),
            Directive::Comment(String::from("Push 1")),
            Directive::Instruction(AsmInstruction::Mov(
                Operand::Immediate(1),
                Operand::Register(Register::Ecx),
            )),
            Directive::Instruction(AsmInstruction::Push(Operand::frame(-8))),
            Directive::Instruction(AsmInstruction::Pop(Operand::Memory {
                base: Register::Esp,
                offset: 0,
            })),
            Directive::Instruction(AsmInstruction::Set(Condition::LessOrEqual, ByteRegister::Al)),
            Directive::Instruction(AsmInstruction::Movzbl(ByteRegister::Al, Register::Eax)),
            Directive::Instruction(AsmInstruction::Call(Symbol::new("write"))),
            Directive::Instruction(AsmInstruction::Jcc(Condition::Equal, label.clone())),
            Directive::LocalLabel(label),
            Directive::Instruction(AsmInstruction::Mov(
                Operand::Address(Symbol::pooled_string(0)),
                Operand::global("exception_payload"),
            )),
            Directive::Instruction(AsmInstruction::Ret),
            Directive::Section(Section::ReadOnlyData),
            Directive::SymbolLabel(Symbol::pooled_string(0)),
            Directive::Asciz(String::from("hi")),
        ],
        exception_names: vec![String::from("IndexOutOfBounds")],
    }
}

#[test]
fn unix_rendering_uses_at_and_t_syntax() {
    let text = render_module(&sample_module(), &RenderOptions::default());

    let expected = "\
# exception 1 = IndexOutOfBounds
    .text
    .globl main
main:
    # Push 1
    movl $1, %ecx
    pushl -8(%ebp)
    popl (%esp)
    setle %al
    movzbl %al, %eax
    call write
    je .Lmain_3
.Lmain_3:
    movl $_pooled_string_0, exception_payload
    ret
    .section .rodata
_pooled_string_0:
    .asciz \"hi\"
";
    assert_eq!(text, expected);
}

#[test]
fn windows_prefixes_global_symbols_but_not_labels() {
    let options = RenderOptions {
        platform: TargetPlatform::Windows,
        comments: true,
    };
    let text = render_module(&sample_module(), &options);

    assert!(text.contains("    .globl _main\n_main:"));
    assert!(text.contains("call _write"));
    assert!(text.contains("je .Lmain_3"));
    assert!(text.contains("movl $__pooled_string_0, _exception_payload"));
}

#[test]
fn comments_can_be_left_out() {
    let options = RenderOptions {
        platform: TargetPlatform::Unix,
        comments: false,
    };
    let text = render_module(&sample_module(), &options);

    assert!(!text.contains('#'));
}

#[test]
fn string_literals_are_escaped() {
    assert_eq!(escape("a\"b\\c\n"), "a\\\"b\\\\c\\n");
    assert_eq!(escape("\u{1}"), "\\001");
}
