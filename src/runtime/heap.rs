//! The heap every executor shares.
//!
//! Strings and arrays live here and are addressed by integer handles, so a
//! handle can sit in a variable, an array element or a machine register.
//! Reference counts are only tracked when the heap is built for the native
//! simulator. The interpreters never free anything.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::values::{TaggedValue, TypeTag};
use crate::return_runtime_error;

/// Small integers are never valid handles
pub const HANDLE_BASE: i32 = 0x1000;

#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    Text(Vec<u8>),
    ScalarArray(Vec<i32>),
    BoxedArray(Vec<TaggedValue>),
}

impl HeapObject {
    fn kind_name(&self) -> &'static str {
        match self {
            HeapObject::Text(_) => "string",
            HeapObject::ScalarArray(_) => "scalar array",
            HeapObject::BoxedArray(_) => "boxed array",
        }
    }

    pub fn is_array(&self) -> bool {
        !matches!(self, HeapObject::Text(_))
    }
}

#[derive(Debug, Clone)]
struct HeapCell {
    object: HeapObject,
    references: i32,
    freed: bool,
}

/// Reference traffic seen by a counting heap over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefcountReport {
    pub arrays_allocated: usize,
    pub live_arrays: Vec<i32>,
    pub increments: usize,
    pub decrements: usize,

    // Releases of an object whose count was already zero
    pub underflows: usize,
}

impl RefcountReport {
    pub fn is_balanced(&self) -> bool {
        self.live_arrays.is_empty() && self.underflows == 0
    }
}

#[derive(Debug, Default)]
pub struct Heap {
    cells: Vec<HeapCell>,
    counting: bool,
    increments: usize,
    decrements: usize,
    underflows: usize,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    pub fn with_refcounting() -> Self {
        Heap {
            counting: true,
            ..Heap::default()
        }
    }

    /// New objects start with one reference, owned by whoever asked for them
    pub fn allocate(&mut self, object: HeapObject) -> i32 {
        let handle = HANDLE_BASE + self.cells.len() as i32;
        self.cells.push(HeapCell {
            object,
            references: 1,
            freed: false,
        });
        handle
    }

    /// Pooled string literals are loaded before anything else runs, in pool order
    pub fn preload_strings(&mut self, pool: &[String]) -> Vec<i32> {
        pool.iter()
            .map(|text| self.allocate(HeapObject::Text(text.as_bytes().to_vec())))
            .collect()
    }

    fn cell_index(&self, handle: i32) -> Result<usize, CompilerError> {
        let index = handle.wrapping_sub(HANDLE_BASE);
        if index < 0 || index as usize >= self.cells.len() {
            return_runtime_error!("{} is not a heap handle", handle);
        }

        Ok(index as usize)
    }

    pub fn object(&self, handle: i32) -> Result<&HeapObject, CompilerError> {
        let cell = &self.cells[self.cell_index(handle)?];
        if cell.freed {
            return_runtime_error!(
                "Use after free: {} {} was already reclaimed",
                cell.object.kind_name(),
                handle
            );
        }

        Ok(&cell.object)
    }

    pub fn object_mut(&mut self, handle: i32) -> Result<&mut HeapObject, CompilerError> {
        let index = self.cell_index(handle)?;
        let cell = &mut self.cells[index];
        if cell.freed {
            return_runtime_error!(
                "Use after free: {} {} was already reclaimed",
                cell.object.kind_name(),
                handle
            );
        }

        Ok(&mut cell.object)
    }

    pub fn text(&self, handle: i32) -> Result<&[u8], CompilerError> {
        match self.object(handle)? {
            HeapObject::Text(bytes) => Ok(bytes),
            other => {
                return_runtime_error!("Expected a string, found a {}", other.kind_name());
            }
        }
    }

    pub fn text_mut(&mut self, handle: i32) -> Result<&mut Vec<u8>, CompilerError> {
        match self.object_mut(handle)? {
            HeapObject::Text(bytes) => Ok(bytes),
            other => {
                return_runtime_error!("Expected a string, found a {}", other.kind_name());
            }
        }
    }

    // ------------------------
    //  Reference counting
    // ------------------------
    pub fn retain(&mut self, value: TaggedValue) -> Result<(), CompilerError> {
        if !self.counting || !value.tag.is_counted() {
            return Ok(());
        }

        let index = self.cell_index(value.value)?;
        let cell = &mut self.cells[index];
        if cell.freed {
            return_runtime_error!("Use after free: retained array {} after it was reclaimed", value.value);
        }

        cell.references += 1;
        self.increments += 1;
        Ok(())
    }

    /// Drops one reference. An array reaching zero is reclaimed
    /// and releases whatever its elements referenced.
    pub fn release(&mut self, value: TaggedValue) -> Result<(), CompilerError> {
        if !self.counting || !value.tag.is_counted() {
            return Ok(());
        }

        let mut pending = vec![value];
        while let Some(value) = pending.pop() {
            let index = self.cell_index(value.value)?;
            self.decrements += 1;

            let cell = &mut self.cells[index];
            if cell.freed || cell.references <= 0 {
                self.underflows += 1;
                continue;
            }

            cell.references -= 1;
            if cell.references == 0 {
                cell.freed = true;
                if let HeapObject::BoxedArray(elements) = &cell.object {
                    pending.extend(elements.iter().filter(|element| element.tag.is_counted()));
                }
            }
        }

        Ok(())
    }

    pub fn references(&self, handle: i32) -> Result<i32, CompilerError> {
        Ok(self.cells[self.cell_index(handle)?].references)
    }

    pub fn report(&self) -> RefcountReport {
        let arrays = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.object.is_array());

        RefcountReport {
            arrays_allocated: arrays.clone().count(),
            live_arrays: arrays
                .filter(|(_, cell)| !cell.freed)
                .map(|(index, _)| HANDLE_BASE + index as i32)
                .collect(),
            increments: self.increments,
            decrements: self.decrements,
            underflows: self.underflows,
        }
    }
}

/// The array a tagged value points at, or a fault when it is not an array
pub fn expect_array(value: TaggedValue, operation: &str) -> Result<i32, CompilerError> {
    match value.tag {
        TypeTag::ScalarArray | TypeTag::BoxedArray => Ok(value.value),
        TypeTag::Scalar => {
            return_runtime_error!("{} expects an array, found the scalar {}", operation, value.value);
        }
    }
}

#[cfg(test)]
#[path = "tests/heap_tests.rs"]
mod tests;
