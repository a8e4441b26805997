use bitlay::{Buffer, FieldSet, Layout};
use criterion::{Criterion, criterion_group, criterion_main};

fn gen_decl(field_count: usize) -> String {
    let mut decl = String::new();

    for i in 0..field_count {
        let ty = match i % 4 {
            0 => "u16",
            1 => "i32b",
            2 => "Bytes[4]",
            _ => "{ a: u8 b: u16b }",
        };
        decl.push_str(&format!("f{}: {} ", i, ty));
    }

    decl
}

fn gen_buffer(len: usize) -> Buffer {
    // Deterministic but non-trivial pattern
    Buffer::new((0..len).map(|i| (i * 31 % 256) as u8).collect())
}

fn bench_layout_parse(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let decl = gen_decl(field_count);

        c.bench_function(&format!("parse_{}_fields", field_count), |b| {
            b.iter(|| {
                let _ = Layout::parse(&decl).unwrap();
            })
        });
    }
}

fn bench_field_access(c: &mut Criterion) {
    for &field_count in &[10usize, 100] {
        let layout = Layout::parse(&gen_decl(field_count)).unwrap();
        let buffer = gen_buffer(layout.size());
        let fields = FieldSet::bind(layout, buffer.full_range(), 0).unwrap();

        c.bench_function(&format!("read_{}_fields", field_count), |b| {
            b.iter(|| {
                let _ = fields.values().unwrap();
            })
        });

        c.bench_function(&format!("write_{}_fields", field_count), |b| {
            b.iter(|| {
                for i in (0..field_count).step_by(4) {
                    fields.set(i, 0x1234u16).unwrap();
                }
            })
        });
    }
}

fn bench_bit_ops(c: &mut Criterion) {
    let buffer = gen_buffer(4096);
    let bits = buffer.bits().slice(3..-5);

    c.bench_function("invert_4k_unaligned", |b| {
        b.iter(|| bits.invert().unwrap())
    });

    c.bench_function("count_ones_4k_unaligned", |b| {
        b.iter(|| bits.count_ones().unwrap())
    });
}

criterion_group!(benches, bench_layout_parse, bench_field_access, bench_bit_ops);
criterion_main!(benches);
