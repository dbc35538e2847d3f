//! triad: one small imperative language, three ways to run it.
//!
//! Source text goes through the frontend into a resolved AST, which is either
//! evaluated directly by the tree interpreter or compiled to a stack program.
//! Stack programs run on the stack interpreter or are lowered to 32-bit x86
//! assembly, which the asm simulator can execute against the same runtime.

pub(crate) mod compiler_frontend;

pub(crate) mod runtime {
    pub(crate) mod heap;
    pub(crate) mod intrinsic_semantics;
    pub(crate) mod tree_interpreter;
}

pub(crate) mod backends {
    pub(crate) mod stack {
        pub(crate) mod code_buffer;
        pub(crate) mod exception_ids;
        pub(crate) mod exit_handlers;
        pub(crate) mod instructions;
        pub(crate) mod stack_compiler;
        pub(crate) mod stack_interpreter;
        pub(crate) mod string_pool;
        pub(crate) mod throw_analysis;
    }

    pub(crate) mod x86 {
        pub(crate) mod asm_entities;
        pub(crate) mod asm_rendering;
        pub(crate) mod asm_simulator;
        pub(crate) mod frame_layout;
        pub(crate) mod symbolic_stack;
        pub(crate) mod x86_codegen;
    }
}

pub(crate) mod build_system {
    pub(crate) mod build;
}

pub mod projects;

pub mod compiler_tests {
    pub mod integration_test_runner;

    #[cfg(test)]
    mod cross_backend_property_tests;
}
