use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gctk::util::alloc::size_classes::{cell_size, size_class, MAX_SMALL_BYTES, SIZE_CLASSES};
use gctk::util::Address;

/// The size-class lookup sits on the small-object allocation fast path.
fn bench_size_class_lookup(c: &mut Criterion) {
    c.bench_function("size_class_lookup", |b| {
        b.iter(|| {
            let mut sum = 0;
            let mut bytes = 8;
            while bytes <= MAX_SMALL_BYTES {
                sum += size_class(black_box(bytes));
                bytes += 8;
            }
            sum
        })
    });

    c.bench_function("cell_size_lookup", |b| {
        b.iter(|| {
            let mut sum = 0;
            for sc in 0..SIZE_CLASSES {
                sum += cell_size(black_box(sc));
            }
            sum
        })
    });
}

fn bench_address_alignment(c: &mut Criterion) {
    c.bench_function("address_align_up", |b| {
        b.iter(|| {
            let mut addr = unsafe { Address::from_usize(0x8000_0001) };
            for align in [8usize, 16, 64, 4096] {
                addr = addr.align_up(black_box(align));
            }
            addr
        })
    });
}

criterion_group!(benches, bench_size_class_lookup, bench_address_alignment);
criterion_main!(benches);
