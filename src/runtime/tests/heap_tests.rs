#![cfg(test)]

use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::language::values::{TaggedValue, TypeTag};
use crate::runtime::heap::{HANDLE_BASE, Heap, HeapObject};

fn scalar_array(heap: &mut Heap, values: Vec<i32>) -> TaggedValue {
    TaggedValue::new(
        heap.allocate(HeapObject::ScalarArray(values)),
        TypeTag::ScalarArray,
    )
}

#[test]
fn handles_start_at_the_base_and_follow_allocation_order() {
    let mut heap = Heap::new();
    let pooled = heap.preload_strings(&["a".to_owned(), "bc".to_owned()]);
    assert_eq!(pooled, vec![HANDLE_BASE, HANDLE_BASE + 1]);

    let array = scalar_array(&mut heap, vec![1]);
    assert_eq!(array.value, HANDLE_BASE + 2);
    assert_eq!(heap.text(pooled[1]).expect("pooled string"), b"bc");
}

#[test]
fn small_integers_are_not_handles() {
    let heap = Heap::new();
    let error = heap.object(7).expect_err("7 is not a handle");
    assert_eq!(error.error_type, ErrorType::Runtime);
}

#[test]
fn interpreter_heap_ignores_reference_traffic() {
    let mut heap = Heap::new();
    let array = scalar_array(&mut heap, vec![1, 2]);

    heap.release(array).expect("release is a no-op");
    heap.release(array).expect("release is a no-op");

    assert!(heap.object(array.value).is_ok());
    assert_eq!(heap.report().decrements, 0);
}

#[test]
fn releasing_the_last_reference_frees_the_array() {
    let mut heap = Heap::with_refcounting();
    let array = scalar_array(&mut heap, vec![1, 2]);

    heap.retain(array).expect("retain");
    assert_eq!(heap.references(array.value).expect("live"), 2);

    heap.release(array).expect("release");
    heap.release(array).expect("release");

    let error = heap.object(array.value).expect_err("freed array");
    assert!(error.msg.contains("Use after free"));

    let report = heap.report();
    assert!(report.is_balanced());
    assert_eq!(report.increments, 1);
    assert_eq!(report.decrements, 2);
}

#[test]
fn freeing_a_boxed_array_releases_its_elements() {
    let mut heap = Heap::with_refcounting();
    let inner = scalar_array(&mut heap, vec![1]);
    heap.retain(inner).expect("retain");

    let outer = TaggedValue::new(
        heap.allocate(HeapObject::BoxedArray(vec![inner, TaggedValue::scalar(3)])),
        TypeTag::BoxedArray,
    );

    // The local reference to `inner` goes away first
    heap.release(inner).expect("release");
    assert_eq!(heap.report().live_arrays.len(), 2);

    heap.release(outer).expect("release");
    assert!(heap.report().is_balanced());
}

#[test]
fn extra_releases_are_counted_as_underflows() {
    let mut heap = Heap::with_refcounting();
    let array = scalar_array(&mut heap, vec![]);

    heap.release(array).expect("release");
    heap.release(array).expect("over-release is recorded, not fatal");

    let report = heap.report();
    assert_eq!(report.underflows, 1);
    assert!(!report.is_balanced());
}

#[test]
fn strings_are_never_counted() {
    let mut heap = Heap::with_refcounting();
    let text = heap.allocate(HeapObject::Text(b"abc".to_vec()));

    heap.release(TaggedValue::scalar(text)).expect("scalars are skipped");

    assert_eq!(heap.text(text).expect("still live"), b"abc");
    assert_eq!(heap.report().arrays_allocated, 0);
}
