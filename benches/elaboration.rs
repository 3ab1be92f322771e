//! Regression guard for the two places evaluation cost is easy to get
//! wrong: approximate conversion on a giant Church numeral (should stay
//! flat, since it never unfolds `mul`/`add`), and a long chain of
//! eta-expanded identity applications (should stay linear in chain length,
//! not blow up from repeated full unfolding).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const NUMERAL_PRELUDE: &str = "\
Nat : U = (N : U) -> (N -> N) -> N -> N;
zero : Nat = \\N s z. z;
suc : Nat -> Nat = \\n N s z. s (n N s z);
add : Nat -> Nat -> Nat = \\a b N s z. a N s (b N s z);
mul : Nat -> Nat -> Nat = \\a b N s z. a N (b N s) z;
Eq : {A : U} -> A -> A -> U = \\{A} x y. (P : A -> U) -> P x -> P y;
refl : {A : U} -> (x : A) -> Eq {A} x x = \\x P px. px;
one : Nat = suc zero;
two : Nat = suc one;
n10 : Nat = add (add (add two two) two) (add two two);
n100 : Nat = mul n10 n10;
n10000 : Nat = mul n100 n100;
";

fn reflexive_numeral_check(c: &mut Criterion) {
    let src = format!(
        "{}\ncheck [elaborate] : Eq {{Nat}} n10000 n10000 = refl n10000;\n",
        NUMERAL_PRELUDE
    );
    c.bench_function("approx_convert_reflexive_numeral", |b| {
        b.iter(|| {
            let reports = minitt::elaborate_source(black_box(&src)).expect("elaborates");
            black_box(reports);
        })
    });
}

fn identity_eta_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity_eta_chain");
    for depth in [4usize, 16, 64] {
        let mut src = String::from("id : {A : U} -> A -> A = \\{A} x. x;\nchain : {A : U} -> A -> A = ");
        for _ in 0..depth {
            src.push_str("id (");
        }
        src.push_str("id");
        for _ in 0..depth {
            src.push(')');
        }
        src.push_str(";\n");

        group.bench_with_input(BenchmarkId::from_parameter(depth), &src, |b, src| {
            b.iter(|| {
                let reports = minitt::elaborate_source(black_box(src)).expect("elaborates");
                black_box(reports);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, reflexive_numeral_check, identity_eta_chain);
criterion_main!(benches);
