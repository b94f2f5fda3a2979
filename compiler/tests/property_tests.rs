// Property-based tests for analyzer invariants.
//
// Three categories:
// 1. Conversions: every base type converts to itself exactly and casts to itself
// 2. Overload selection: the outcome does not depend on candidate order
// 3. Generated programs: decoration never faults, binds every identifier,
//    types every expression, and is deterministic
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use proptest::prelude::*;
use shdc::ast::{ExprKind, Program, SymbolRef};
use shdc::builder::ProgramBuilder;
use shdc::config::{ShaderInput, ShaderOutput, ShaderTarget};
use shdc::diag::DiagLevel;
use shdc::id::StmtId;
use shdc::overload::select_overload;
use shdc::types::{can_cast, implicit_rank, ConversionRank, ScalarType, TypeDenoter};

// ── Test helpers ────────────────────────────────────────────────────────────

fn arb_scalar() -> impl Strategy<Value = ScalarType> {
    prop_oneof![
        Just(ScalarType::Bool),
        Just(ScalarType::Int),
        Just(ScalarType::UInt),
        Just(ScalarType::Half),
        Just(ScalarType::Float),
        Just(ScalarType::Double),
    ]
}

fn arb_base_type() -> impl Strategy<Value = TypeDenoter> {
    prop_oneof![
        arb_scalar().prop_map(TypeDenoter::scalar),
        (arb_scalar(), 2u8..=4).prop_map(|(s, n)| TypeDenoter::vector(s, n)),
        (arb_scalar(), 1u8..=4, 1u8..=4).prop_map(|(s, r, c)| TypeDenoter::matrix(s, r, c)),
    ]
}

/// One statement of a generated fragment-shader body.
#[derive(Debug, Clone)]
enum Op {
    /// `T v<name> = <literal>;`
    Declare { name: usize, ty: usize, literal: usize },
    /// `v<lhs> = v<rhs>;`
    Assign { lhs: usize, rhs: usize },
    /// `<intrinsic>(v<arg>);`
    Intrinsic { func: usize, arg: usize },
    /// `v<name>;`
    Use { name: usize },
}

const NAMES: usize = 4;
const TYPES: [fn() -> TypeDenoter; 4] = [
    TypeDenoter::float,
    TypeDenoter::int,
    float2,
    TypeDenoter::bool,
];
const INTRINSICS: [&str; 4] = ["abs", "saturate", "length", "dot"];

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..NAMES, 0..TYPES.len(), 0usize..3)
            .prop_map(|(name, ty, literal)| Op::Declare { name, ty, literal }),
        (0..NAMES, 0..NAMES).prop_map(|(lhs, rhs)| Op::Assign { lhs, rhs }),
        (0..INTRINSICS.len(), 0..NAMES).prop_map(|(func, arg)| Op::Intrinsic { func, arg }),
        (0..NAMES).prop_map(|name| Op::Use { name }),
    ]
}

fn float2() -> TypeDenoter {
    TypeDenoter::vector(ScalarType::Float, 2)
}

fn var_name(i: usize) -> String {
    format!("v{}", i)
}

fn build_program(ops: &[Op]) -> Program {
    let mut b = ProgramBuilder::new();
    let mut stmts: Vec<StmtId> = Vec::new();
    for op in ops {
        let stmt = match *op {
            Op::Declare { name, ty, literal } => {
                let init = match literal {
                    0 => b.int(1),
                    1 => b.float(0.5),
                    _ => b.boolean(true),
                };
                let var = b.var_with(&var_name(name), TYPES[ty](), |v| v.initializer = Some(init));
                b.decl_stmt(vec![var])
            }
            Op::Assign { lhs, rhs } => {
                let l = b.name(&var_name(lhs));
                let r = b.name(&var_name(rhs));
                let assign = b.assign(l, r);
                b.expr_stmt(assign)
            }
            Op::Intrinsic { func, arg } => {
                let a = b.name(&var_name(arg));
                let call = b.call(INTRINSICS[func], vec![a]);
                b.expr_stmt(call)
            }
            Op::Use { name } => {
                let e = b.name(&var_name(name));
                b.expr_stmt(e)
            }
        };
        stmts.push(stmt);
    }
    let one = b.float(1.0);
    let value = b.construct(TypeDenoter::vector(ScalarType::Float, 4), vec![one]);
    stmts.push(b.ret(Some(value)));
    let body = b.block(stmts);
    let main = b.entry_function(
        "main",
        TypeDenoter::vector(ScalarType::Float, 4),
        "SV_Target",
        vec![],
        body,
    );
    b.global(main);
    b.finish()
}

fn run(program: &mut Program) -> (bool, Vec<String>) {
    let result = shdc::decorate(
        program,
        &ShaderInput::new("main", ShaderTarget::Fragment),
        &ShaderOutput::default(),
    )
    .expect("analysis must not fault");
    let errors = result
        .diagnostics
        .iter()
        .any(|d| d.level == DiagLevel::Error);
    assert_eq!(result.success, !errors);
    (
        result.success,
        result.diagnostics.iter().map(ToString::to_string).collect(),
    )
}

// ── Conversions ─────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 100,
        .. ProptestConfig::default()
    })]

    #[test]
    fn identity_conversion_is_exact(ty in arb_base_type()) {
        prop_assert_eq!(implicit_rank(&ty, &ty), Some(ConversionRank::Exact));
        prop_assert!(can_cast(&ty, &ty, &Program::new()));
    }

    #[test]
    fn scalar_promotion_reverses_to_conversion(from in arb_scalar(), to in arb_scalar()) {
        prop_assume!(from != to);
        let a = TypeDenoter::scalar(from);
        let b = TypeDenoter::scalar(to);
        let there = implicit_rank(&a, &b);
        let back = implicit_rank(&b, &a);
        prop_assert!(there.is_some() && back.is_some());
        prop_assert_ne!(there, back);
        prop_assert!(there != Some(ConversionRank::Exact));
    }
}

// ── Overload selection ──────────────────────────────────────────────────────

fn arb_candidates() -> impl Strategy<Value = Vec<(u32, Vec<TypeDenoter>)>> {
    prop::collection::vec(prop::collection::vec(arb_base_type(), 1..=2), 1..6).prop_map(
        |params| {
            params
                .into_iter()
                .enumerate()
                .map(|(i, p)| (i as u32, p))
                .collect()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 100,
        .. ProptestConfig::default()
    })]

    #[test]
    fn overload_choice_ignores_candidate_order(
        (candidates, shuffled) in arb_candidates()
            .prop_flat_map(|c| (Just(c.clone()), Just(c).prop_shuffle())),
        args in prop::collection::vec(arb_base_type(), 1..=2),
    ) {
        prop_assert_eq!(
            select_overload(&candidates, &args),
            select_overload(&shuffled, &args)
        );
    }

    #[test]
    fn exact_candidate_wins_when_unique(
        candidates in arb_candidates(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (handle, params) = pick.get(&candidates).clone();
        let duplicates = candidates.iter().filter(|(_, p)| *p == params).count();
        prop_assume!(duplicates == 1);
        prop_assert_eq!(select_overload(&candidates, &params), Ok(handle));
    }
}

// ── Generated programs ──────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn decoration_binds_and_types_everything(ops in prop::collection::vec(arb_op(), 0..16)) {
        let mut program = build_program(&ops);
        run(&mut program);

        for expr in &program.exprs {
            prop_assert!(expr.ty.is_some(), "untyped expression {:?}", expr.kind);
            if let ExprKind::Ident { symbol, ident } = &expr.kind {
                prop_assert!(
                    *symbol != SymbolRef::Unresolved,
                    "identifier '{}' left unresolved",
                    ident.name
                );
            }
        }
    }

    #[test]
    fn decoration_is_deterministic(ops in prop::collection::vec(arb_op(), 0..16)) {
        let mut first = build_program(&ops);
        let mut second = first.clone();
        let a = run(&mut first);
        let b = run(&mut second);
        prop_assert_eq!(a, b);
        prop_assert_eq!(shdc::dump::dump(&first), shdc::dump::dump(&second));
    }
}
