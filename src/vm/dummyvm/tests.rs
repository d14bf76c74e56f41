use std::sync::Once;

use super::*;
use crate::memory_manager;
use crate::plan::Plan;
use crate::policy::space::Space;
use crate::util::alloc::size_classes::MAX_SMALL_BYTES;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::test_util::serial_test;
use crate::util::OpaquePointer;

static INIT: Once = Once::new();

const HEAP_SIZE: usize = 256 << 20;

/// Tests share the one heap range, so they run under the global test
/// lock, against a heap mapped once.
fn with_initialized_heap<F: FnOnce()>(f: F) {
    serial_test(|| {
        INIT.call_once(|| memory_manager::gc_init(&SINGLETON, HEAP_SIZE));
        f();
    })
}

#[test]
fn allocation_returns_distinct_word_aligned_cells() {
    with_initialized_heap(|| {
        let mut mutator = memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
        let a = alloc_object(&mut mutator, 2);
        let b = alloc_object(&mut mutator, 2);
        assert!(!a.is_null());
        assert_ne!(a, b);
        assert!(a.to_address().is_aligned_to(BYTES_IN_WORD));
        assert!(memory_manager::is_valid_ref(&SINGLETON, a));
        assert!(memory_manager::used_pages(&SINGLETON) > 0);
        assert_eq!(field_count(a), 2);
        assert!(load_field(a, 0).is_null());
        memory_manager::destroy_mutator(mutator);
    })
}

#[test]
fn oversize_requests_route_to_the_large_object_space() {
    with_initialized_heap(|| {
        let mut mutator = memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
        let fields = MAX_SMALL_BYTES / BYTES_IN_WORD;
        assert!(object_size(fields) > MAX_SMALL_BYTES);
        let big = alloc_object(&mut mutator, fields);
        assert!(SINGLETON.plan.common().get_los().in_space(big));
        assert!(memory_manager::is_live_object(&SINGLETON, big));
        assert!(memory_manager::will_never_move(&SINGLETON, big));
        memory_manager::destroy_mutator(mutator);
    })
}

#[test]
fn immortal_objects_are_always_live() {
    with_initialized_heap(|| {
        let mut mutator = memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
        let size = object_size(1);
        let addr = memory_manager::alloc(
            &mut mutator,
            size,
            BYTES_IN_WORD,
            0,
            crate::plan::Allocator::Immortal,
        );
        assert!(!addr.is_zero());
        let object = unsafe { addr.to_object_reference() };
        unsafe { (addr + BYTES_IN_WORD).store::<usize>(1) };
        memory_manager::post_alloc(
            &mut mutator,
            object,
            crate::util::ObjectReference::NULL,
            size,
            crate::plan::Allocator::Immortal,
        );
        assert!(SINGLETON.plan.common().get_immortal().in_space(object));
        assert!(memory_manager::is_live_object(&SINGLETON, object));
        memory_manager::destroy_mutator(mutator);
    })
}

#[cfg(not(any(feature = "copyms", feature = "markcompact")))]
mod block_exhaustion {
    use super::*;
    use crate::policy::marksweepspace::block::cells_in_block;
    use crate::util::alloc::size_classes::size_class;

    #[test]
    fn a_full_block_forces_a_page_acquisition() {
        with_initialized_heap(|| {
            let mut mutator =
                memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
            // 3 fields + the two header words make a 40 byte object.
            let fields = 3;
            assert_eq!(object_size(fields), 40);
            let cells = cells_in_block(size_class(40));

            let before = memory_manager::used_pages(&SINGLETON);
            alloc_object(&mut mutator, fields);
            let with_block = memory_manager::used_pages(&SINGLETON);
            assert!(with_block > before);

            // The rest of the block's cells come from the same pages.
            for _ in 1..cells {
                alloc_object(&mut mutator, fields);
            }
            assert_eq!(memory_manager::used_pages(&SINGLETON), with_block);

            // One more and the allocator has to go back to the page pool.
            alloc_object(&mut mutator, fields);
            assert!(memory_manager::used_pages(&SINGLETON) > with_block);
            memory_manager::destroy_mutator(mutator);
        })
    }
}

#[cfg(not(any(feature = "copyms", feature = "markcompact")))]
mod mark_closure {
    use super::*;
    use crate::plan::marksweep::MSTraceLocal;
    use crate::plan::TraceLocal;
    use crate::util::Address;
    use crate::vm::Scanning;

    #[test]
    fn closure_terminates_over_cycles_and_marks_only_the_reachable() {
        with_initialized_heap(|| {
            let mut mutator =
                memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
            let a = alloc_object(&mut mutator, 1);
            let b = alloc_object(&mut mutator, 1);
            let c = alloc_object(&mut mutator, 1);
            let unreferenced = alloc_object(&mut mutator, 1);
            store_field(a, 0, b);
            store_field(b, 0, c);
            store_field(c, 0, a);

            // Age the allocation marks so only the trace decides liveness.
            SINGLETON.plan.get_ms().prepare();
            assert!(!memory_manager::is_live_object(&SINGLETON, a));

            let mut trace = MSTraceLocal::new(&SINGLETON.plan);
            trace.init(OpaquePointer::UNINITIALIZED);
            let kept = memory_manager::trace_root_object(&mut trace, a);
            assert_eq!(kept, a);
            trace.complete_trace();

            for object in [a, b, c] {
                assert!(memory_manager::is_live_object(&SINGLETON, object));
            }
            assert!(!memory_manager::is_live_object(&SINGLETON, unreferenced));

            // Revisiting a black object neither moves it nor revives the
            // closure.
            assert_eq!(trace.trace_object(a), a);
            trace.complete_trace();
            trace.release();
            memory_manager::destroy_mutator(mutator);
        })
    }

    #[test]
    fn registered_root_slots_are_traced_and_left_intact() {
        with_initialized_heap(|| {
            let mut mutator =
                memory_manager::bind_mutator(&SINGLETON, OpaquePointer::UNINITIALIZED);
            let parent = alloc_object(&mut mutator, 1);
            let child = alloc_object(&mut mutator, 0);
            store_field(parent, 0, child);

            let mut root = parent;
            ROOTS
                .lock()
                .unwrap()
                .push(Address::from_mut_ptr(&mut root));

            SINGLETON.plan.get_ms().prepare();
            let mut trace = MSTraceLocal::new(&SINGLETON.plan);
            trace.init(OpaquePointer::UNINITIALIZED);
            DummyScanning::compute_thread_roots(&mut trace, OpaquePointer::UNINITIALIZED);
            trace.complete_trace();
            trace.release();
            ROOTS.lock().unwrap().clear();

            // Mark-sweep never moves, so the slot still names the same
            // object, now live.
            assert_eq!(root, parent);
            assert!(memory_manager::is_live_object(&SINGLETON, parent));
            assert!(memory_manager::is_live_object(&SINGLETON, child));
            assert!(memory_manager::will_not_move_in_current_collection(
                &trace, parent
            ));
            memory_manager::destroy_mutator(mutator);
        })
    }
}
