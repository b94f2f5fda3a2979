// Decoration tests: whole-program scenarios through the public `decorate` API.
//
// Programs are assembled with `ProgramBuilder`; each test checks the reports
// (by code) and the annotations written into the tree.

use shdc::ast::*;
use shdc::builder::ProgramBuilder;
use shdc::config::{InputShaderVersion, ShaderInput, ShaderModel, ShaderOutput, ShaderTarget};
use shdc::diag::codes;
use shdc::id::{DeclId, ExprId, StmtId};
use shdc::semantic::{IndexedSemantic, SystemValue};
use shdc::types::{SamplerKind, ScalarType, TextureKind, TypeDenoter};
use shdc::DecorateResult;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn fvec(n: u8) -> TypeDenoter {
    TypeDenoter::vector(ScalarType::Float, n)
}

fn decorate_with(program: &mut Program, input: ShaderInput, output: ShaderOutput) -> DecorateResult {
    shdc::decorate(program, &input, &output).expect("analysis must not fault")
}

fn decorate(program: &mut Program, target: ShaderTarget) -> DecorateResult {
    decorate_with(program, ShaderInput::new("main", target), ShaderOutput::default())
}

fn codes_of(result: &DecorateResult) -> Vec<&'static str> {
    result
        .diagnostics
        .iter()
        .map(|d| d.code.map_or("-", |c| c.0))
        .collect()
}

/// `float4 main(...) : SV_Target { <stmts>; return float4(1.0); }`
fn fragment_main(b: &mut ProgramBuilder, params: Vec<DeclId>, mut stmts: Vec<StmtId>) -> DeclId {
    let one = b.float(1.0);
    let value = b.construct(fvec(4), vec![one]);
    let ret = b.ret(Some(value));
    stmts.push(ret);
    let body = b.block(stmts);
    let main = b.entry_function("main", fvec(4), "SV_Target", params, body);
    b.global(main);
    main
}

fn call_target(program: &Program, call: ExprId) -> CallTarget {
    match &program[call].kind {
        ExprKind::Call(c) => c.target.clone(),
        _ => CallTarget::Unresolved,
    }
}

// ── Entry point interface ───────────────────────────────────────────────────

#[test]
fn vertex_struct_interface_is_classified() {
    let mut b = ProgramBuilder::new();
    let in_pos = b.io_var("pos", fvec(4), &["POSITION"]);
    let in_uv = b.io_var("uv", fvec(2), &["TEXCOORD0"]);
    let vs_in = b.structure("VSInput", vec![in_pos, in_uv]);
    b.global(vs_in);
    let out_pos = b.io_var("pos", fvec(4), &["SV_Position"]);
    let out_uv = b.io_var("uv", fvec(2), &["TEXCOORD0"]);
    let vs_out = b.structure("VSOutput", vec![out_pos, out_uv]);
    b.global(vs_out);

    let input = b.var("input", TypeDenoter::named("VSInput"));
    let o = b.var("o", TypeDenoter::named("VSOutput"));
    let decl_o = b.decl_stmt(vec![o]);
    let mut stmts = vec![decl_o];
    for field in ["pos", "uv"] {
        let o_ref = b.name("o");
        let lhs = b.member(o_ref, field);
        let in_ref = b.name("input");
        let rhs = b.member(in_ref, field);
        let assign = b.assign(lhs, rhs);
        stmts.push(b.expr_stmt(assign));
    }
    let o_ref = b.name("o");
    stmts.push(b.ret(Some(o_ref)));
    let body = b.block(stmts);
    let main = b.function("main", TypeDenoter::named("VSOutput"), vec![input], Some(body));
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Vertex);
    assert!(result.success, "{:?}", result.diagnostics);
    assert!(result.diagnostics.is_empty());

    let func = program.function(main).unwrap();
    assert!(func.is_entry_point);
    assert_eq!(program.entry_point, Some(main));
    assert_eq!(
        func.entry_inputs,
        vec![
            EntryBinding {
                decl: Some(in_pos),
                semantic: IndexedSemantic::user_defined("POSITION", 0),
            },
            EntryBinding {
                decl: Some(in_uv),
                semantic: IndexedSemantic::user_defined("TEXCOORD", 0),
            },
        ]
    );
    assert_eq!(func.entry_outputs.len(), 2);
    assert_eq!(
        func.entry_outputs[0].semantic,
        IndexedSemantic::system_value(SystemValue::Position, 0)
    );

    let vs_out_decl = program.struct_decl(vs_out).unwrap();
    assert!(vs_out_decl.io.output);
    assert_eq!(vs_out_decl.system_value_members, vec![out_pos]);
    assert!(program.struct_decl(vs_in).unwrap().io.input);
    assert!(program.var(in_pos).unwrap().io.input);
    assert!(program[vs_in].reachable);
}

#[test]
fn missing_semantic_reported_once_and_siblings_continue() {
    let mut b = ProgramBuilder::new();
    let pos = b.io_var("pos", fvec(4), &["SV_Position"]);
    let uv = b.var("uv", fvec(2));
    let normal = b.io_var("n", fvec(3), &["NORMAL"]);
    let vs_out = b.structure("VSOut", vec![pos, uv, normal]);
    b.global(vs_out);
    let o = b.var("o", TypeDenoter::named("VSOut"));
    let decl_o = b.decl_stmt(vec![o]);
    let o_ref = b.name("o");
    let ret = b.ret(Some(o_ref));
    let body = b.block(vec![decl_o, ret]);
    let main = b.function("main", TypeDenoter::named("VSOut"), vec![], Some(body));
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Vertex);
    assert!(!result.success);
    assert_eq!(codes_of(&result), vec![codes::MISSING_SEMANTIC.0]);
    assert!(result.diagnostics[0].message.contains("'uv'"));

    let outputs = &program.function(main).unwrap().entry_outputs;
    let decls: Vec<Option<DeclId>> = outputs.iter().map(|b| b.decl).collect();
    assert_eq!(decls, vec![Some(pos), Some(normal)]);
}

#[test]
fn many_inputs_produce_one_binding_each() {
    const N: usize = 12;
    let mut b = ProgramBuilder::new();
    let members: Vec<DeclId> = (0..N)
        .map(|i| {
            let semantic = format!("TEXCOORD{}", i);
            b.io_var(&format!("t{}", i), fvec(4), &[semantic.as_str()])
        })
        .collect();
    let strukt = b.structure("PSIn", members);
    b.global(strukt);
    let input = b.var("input", TypeDenoter::named("PSIn"));
    let main = fragment_main(&mut b, vec![input], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    let inputs = &program.function(main).unwrap().entry_inputs;
    assert_eq!(inputs.len(), N);
    for (i, binding) in inputs.iter().enumerate() {
        assert_eq!(binding.semantic, IndexedSemantic::user_defined("TEXCOORD", i as u32));
    }
}

#[test]
fn duplicate_input_semantic_is_reported() {
    let mut b = ProgramBuilder::new();
    let a = b.io_var("a", fvec(2), &["TEXCOORD0"]);
    let c = b.io_var("c", fvec(2), &["TEXCOORD0"]);
    fragment_main(&mut b, vec![a, c], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::DUPLICATE_BINDING.0]);
    assert_eq!(result.diagnostics[0].related_spans.len(), 1);
}

#[test]
fn system_value_must_suit_the_stage() {
    let mut b = ProgramBuilder::new();
    let zero = b.float(0.0);
    let value = b.construct(fvec(4), vec![zero]);
    let ret = b.ret(Some(value));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Vertex);
    assert_eq!(
        codes_of(&result),
        vec![codes::INVALID_SYSTEM_VALUE.0, codes::MISSING_POSITION_OUTPUT.0]
    );
}

#[test]
fn legacy_color_output_maps_to_target_in_hlsl3() {
    let build = || {
        let mut b = ProgramBuilder::new();
        let uv = b.io_var("uv", fvec(2), &["TEXCOORD0"]);
        let uv_ref = b.name("uv");
        let z = b.float(0.0);
        let w = b.float(1.0);
        let value = b.construct(fvec(4), vec![uv_ref, z, w]);
        let ret = b.ret(Some(value));
        let body = b.block(vec![ret]);
        let main = b.entry_function("main", fvec(4), "COLOR", vec![uv], body);
        b.global(main);
        (b.finish(), main)
    };

    let (mut legacy, main) = build();
    let mut input = ShaderInput::new("main", ShaderTarget::Fragment);
    input.shader_version = InputShaderVersion::Hlsl3;
    let result = decorate_with(&mut legacy, input, ShaderOutput::default());
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(
        legacy.function(main).unwrap().entry_outputs[0].semantic,
        IndexedSemantic::system_value(SystemValue::Target, 0)
    );

    let (mut modern, main) = build();
    let result = decorate(&mut modern, ShaderTarget::Fragment);
    assert!(result.success);
    assert_eq!(
        modern.function(main).unwrap().entry_outputs[0].semantic,
        IndexedSemantic::user_defined("COLOR", 0)
    );
}

#[test]
fn missing_entry_point_is_reported() {
    let mut b = ProgramBuilder::new();
    let body = b.block(vec![]);
    let f = b.function("helper", TypeDenoter::Void, vec![], Some(body));
    b.global(f);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Vertex);
    assert_eq!(codes_of(&result), vec![codes::ENTRY_POINT_NOT_FOUND.0]);
    assert_eq!(program.entry_point, None);
}

#[test]
fn warnings_can_be_disabled() {
    let mut b = ProgramBuilder::new();
    let body = b.block(vec![]);
    let main = b.function("main", TypeDenoter::Void, vec![], Some(body));
    b.global(main);
    let mut program = b.finish();

    let input = ShaderInput::new("main", ShaderTarget::Vertex);
    let result = decorate_with(&mut program, input.clone(), ShaderOutput { warnings: false });
    assert!(result.success);
    assert!(result.diagnostics.is_empty());

    let mut b = ProgramBuilder::new();
    let body = b.block(vec![]);
    let main = b.function("main", TypeDenoter::Void, vec![], Some(body));
    b.global(main);
    let mut program = b.finish();
    let result = decorate_with(&mut program, input, ShaderOutput::default());
    assert!(result.success);
    assert_eq!(codes_of(&result), vec![codes::MISSING_POSITION_OUTPUT.0]);
}

// ── Name resolution and calls ───────────────────────────────────────────────

#[test]
fn bool_argument_is_ambiguous_between_float_and_int() {
    let mut b = ProgramBuilder::new();
    for ty in [TypeDenoter::float(), TypeDenoter::int()] {
        let x = b.var("x", ty);
        let x_ref = b.name("x");
        let ret = b.ret(Some(x_ref));
        let body = b.block(vec![ret]);
        let f = b.function("f", TypeDenoter::float(), vec![x], Some(body));
        b.global(f);
    }
    let arg = b.boolean(true);
    let call = b.call("f", vec![arg]);
    let stmt = b.expr_stmt(call);
    fragment_main(&mut b, vec![], vec![stmt]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::AMBIGUOUS_CALL.0]);
    assert_eq!(result.diagnostics[0].related_spans.len(), 2);
    assert_eq!(call_target(&program, call), CallTarget::Error);
    assert_eq!(program[call].ty, Some(TypeDenoter::Error));
}

#[test]
fn exact_overload_is_selected() {
    let mut b = ProgramBuilder::new();
    let mut funcs = Vec::new();
    for ty in [TypeDenoter::float(), TypeDenoter::int()] {
        let x = b.var("x", ty);
        let x_ref = b.name("x");
        let ret = b.ret(Some(x_ref));
        let body = b.block(vec![ret]);
        let f = b.function("f", TypeDenoter::float(), vec![x], Some(body));
        b.global(f);
        funcs.push(f);
    }
    let arg = b.int(3);
    let call = b.call("f", vec![arg]);
    let stmt = b.expr_stmt(call);
    fragment_main(&mut b, vec![], vec![stmt]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(call_target(&program, call), CallTarget::Function(funcs[1]));
    assert!(program[funcs[1]].reachable);
    assert!(!program[funcs[0]].reachable);
}

#[test]
fn callee_signature_ignores_caller_locals() {
    let mut b = ProgramBuilder::new();
    let c = b.var("c", fvec(4));
    let light = b.structure("Light", vec![c]);
    b.global(light);

    let lt = b.var("lt", TypeDenoter::named("Light"));
    let one = b.float(1.0);
    let shadow = b.var_with("Light", TypeDenoter::float(), |v| v.initializer = Some(one));
    let decls = b.decl_stmt(vec![lt, shadow]);
    let lt_ref = b.name("lt");
    let call = b.call("shade", vec![lt_ref]);
    let ret = b.ret(Some(call));
    let body = b.block(vec![decls, ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![], body);
    b.global(main);

    // Defined after the caller, so its signature is first needed inside `main`.
    let l = b.var("l", TypeDenoter::named("Light"));
    let l_ref = b.name("l");
    let member = b.member(l_ref, "c");
    let ret = b.ret(Some(member));
    let body = b.block(vec![ret]);
    let shade = b.function("shade", fvec(4), vec![l], Some(body));
    b.global(shade);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(call_target(&program, call), CallTarget::Function(shade));
    let param_ty = program.var(l).and_then(|v| v.resolved_type.clone());
    assert!(matches!(param_ty, Some(TypeDenoter::Struct { decl, .. }) if decl == light));
    assert_eq!(program[call].ty, Some(fvec(4)));
}

#[test]
fn aliases_expand_in_signatures_and_members() {
    let mut b = ProgramBuilder::new();
    let v = b.alias("V", fvec(3));
    b.global(v);
    let looped = b.alias("Loop", TypeDenoter::named("Loop"));
    b.global(looped);
    let normal = b.var("normal", TypeDenoter::named("V"));
    let surface = b.structure("Surface", vec![normal]);
    b.global(surface);

    let mut picks = Vec::new();
    for (ty, body_of) in [(TypeDenoter::named("V"), Some("x")), (TypeDenoter::float(), None)] {
        let p = b.var("p", ty);
        let p_ref = b.name("p");
        let value = match body_of {
            Some(swizzle) => b.member(p_ref, swizzle),
            None => p_ref,
        };
        let ret = b.ret(Some(value));
        let body = b.block(vec![ret]);
        let f = b.function("pick", TypeDenoter::float(), vec![p], Some(body));
        b.global(f);
        picks.push((f, p));
    }

    let s = b.var("s", TypeDenoter::named("Surface"));
    let decl = b.decl_stmt(vec![s]);
    let s_ref = b.name("s");
    let arg = b.member(s_ref, "normal");
    let call = b.call("pick", vec![arg]);
    let stmt = b.expr_stmt(call);
    fragment_main(&mut b, vec![], vec![decl, stmt]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::UNDECLARED_TYPE.0]);
    assert!(result.diagnostics[0].message.contains("'Loop' refers to itself"));

    assert_eq!(call_target(&program, call), CallTarget::Function(picks[0].0));
    assert_eq!(program[arg].ty, Some(fvec(3)));
    assert_eq!(program.var(normal).and_then(|v| v.resolved_type.clone()), Some(fvec(3)));
    assert_eq!(program.var(picks[0].1).and_then(|v| v.resolved_type.clone()), Some(fvec(3)));
    for decl in &program.decls {
        let resolved = match &decl.kind {
            DeclKind::Var(var) => var.resolved_type.as_ref(),
            DeclKind::Alias(alias) => alias.resolved_type.as_ref(),
            _ => None,
        };
        assert!(
            !matches!(resolved, Some(TypeDenoter::Named(_))),
            "'{}' kept an unexpanded type name",
            decl.ident.name
        );
    }
}

#[test]
fn undeclared_function_yields_error_type_without_cascade() {
    let mut b = ProgramBuilder::new();
    let one = b.int(1);
    let two = b.int(2);
    let call = b.call("g", vec![one, two]);
    let scale = b.float(2.0);
    let product = b.binary(BinaryOp::Mul, call, scale);
    let ret = b.ret(Some(product));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::NO_MATCHING_OVERLOAD.0]);
    assert!(result.diagnostics[0].message.contains("'g'"));
    assert_eq!(program[call].ty, Some(TypeDenoter::Error));
    assert_eq!(program[product].ty, Some(TypeDenoter::Error));
}

#[test]
fn undeclared_identifier_reported_once_per_use() {
    let mut b = ProgramBuilder::new();
    let missing = b.name("missing");
    let two = b.float(2.0);
    let product = b.binary(BinaryOp::Mul, missing, two);
    let bracket = b.bracket(product);
    let swizzle = b.member(bracket, "xxxx");
    let ret = b.ret(Some(swizzle));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::UNDECLARED_IDENT.0]);
    match &program[missing].kind {
        ExprKind::Ident { symbol, .. } => assert_eq!(*symbol, SymbolRef::Error),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn prototype_is_replaced_by_definition() {
    let mut b = ProgramBuilder::new();
    let px = b.var("x", TypeDenoter::float());
    let proto = b.function("h", TypeDenoter::float(), vec![px], None);
    b.global(proto);

    let arg = b.float(1.0);
    let call = b.call("h", vec![arg]);
    let stmt = b.expr_stmt(call);
    fragment_main(&mut b, vec![], vec![stmt]);

    let dx = b.var("x", TypeDenoter::float());
    let x_ref = b.name("x");
    let ret = b.ret(Some(x_ref));
    let body = b.block(vec![ret]);
    let def = b.function("h", TypeDenoter::float(), vec![dx], Some(body));
    b.global(def);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(call_target(&program, call), CallTarget::Function(def));
}

#[test]
fn local_redefinition_is_reported() {
    let mut b = ProgramBuilder::new();
    let mut stmts = Vec::new();
    for v in [1.0, 2.0] {
        let init = b.float(v);
        let a = b.var_with("a", TypeDenoter::float(), |var| var.initializer = Some(init));
        stmts.push(b.decl_stmt(vec![a]));
    }
    fragment_main(&mut b, vec![], stmts);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::REDEFINITION.0]);
    assert_eq!(result.diagnostics[0].related_spans.len(), 1);
}

// ── Resources and intrinsics ────────────────────────────────────────────────

#[test]
fn texture_sample_resolves_to_element_type() {
    let mut b = ProgramBuilder::new();
    let tex = b.texture("tex", TextureKind::Texture2D, Some("t0"));
    b.global(tex);
    let smp = b.sampler("smp", SamplerKind::SamplerState, Some("s0"));
    b.global(smp);
    let uv = b.io_var("uv", fvec(2), &["TEXCOORD0"]);
    let tex_ref = b.name("tex");
    let smp_ref = b.name("smp");
    let uv_ref = b.name("uv");
    let sample = b.method_call(tex_ref, "Sample", vec![smp_ref, uv_ref]);
    let ret = b.ret(Some(sample));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![uv], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(program[sample].ty, Some(fvec(4)));
    assert!(matches!(call_target(&program, sample), CallTarget::Intrinsic(_)));
    assert!(program[tex].reachable);
    assert!(program[smp].reachable);
}

#[test]
fn texture_used_as_value_is_misuse() {
    let mut b = ProgramBuilder::new();
    let tex = b.texture("tex", TextureKind::Texture2D, None);
    b.global(tex);
    let tex_ref = b.name("tex");
    let c = b.var_with("c", fvec(4), |v| v.initializer = Some(tex_ref));
    let decl = b.decl_stmt(vec![c]);
    fragment_main(&mut b, vec![], vec![decl]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::RESOURCE_MISUSE.0]);
    assert_eq!(program[tex_ref].ty, Some(TypeDenoter::Error));
}

#[test]
fn parenthesized_resources_are_valid_operands() {
    let mut b = ProgramBuilder::new();
    let tex = b.texture("tex", TextureKind::Texture2D, Some("t0"));
    b.global(tex);
    let smp = b.sampler("smp", SamplerKind::SamplerState, Some("s0"));
    b.global(smp);

    let t = b.var("t", TypeDenoter::Texture(TextureKind::Texture2D));
    let s = b.var("s", TypeDenoter::Sampler(SamplerKind::SamplerState));
    let coord = b.var("coord", fvec(2));
    let t_ref = b.name("t");
    let s_ref = b.name("s");
    let s_wrapped = b.bracket(s_ref);
    let coord_ref = b.name("coord");
    let sample = b.method_call(t_ref, "Sample", vec![s_wrapped, coord_ref]);
    let ret = b.ret(Some(sample));
    let body = b.block(vec![ret]);
    let fetch = b.function("fetch", fvec(4), vec![t, s, coord], Some(body));
    b.global(fetch);

    let uv = b.io_var("uv", fvec(2), &["TEXCOORD0"]);
    let tex_ref = b.name("tex");
    let tex_wrapped = b.bracket(tex_ref);
    let tex_twice = b.bracket(tex_wrapped);
    let smp_ref = b.name("smp");
    let uv_ref = b.name("uv");
    let call = b.call("fetch", vec![tex_twice, smp_ref, uv_ref]);
    let ret = b.ret(Some(call));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![uv], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(call_target(&program, call), CallTarget::Function(fetch));
    assert_eq!(program[tex_ref].ty, Some(TypeDenoter::Texture(TextureKind::Texture2D)));
    assert_eq!(program[sample].ty, Some(fvec(4)));
}

#[test]
fn bad_register_prefix_is_reported() {
    let mut b = ProgramBuilder::new();
    let tex = b.texture("tex", TextureKind::Texture2D, Some("s0"));
    b.global(tex);
    fragment_main(&mut b, vec![], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::INVALID_REGISTER.0]);
}

#[test]
fn intrinsic_requires_shader_model() {
    let mut b = ProgramBuilder::new();
    let c = b.io_var("c", fvec(4), &["COLOR0"]);
    let args: Vec<_> = (0..3).map(|_| b.name("c")).collect();
    let mad = b.call("mad", args);
    let ret = b.ret(Some(mad));
    let body = b.block(vec![ret]);
    let main = b.entry_function("main", fvec(4), "SV_Target", vec![c], body);
    b.global(main);
    let mut program = b.finish();

    let mut input = ShaderInput::new("main", ShaderTarget::Fragment);
    input.shader_model = ShaderModel::new(4, 0);
    let result = decorate_with(&mut program, input, ShaderOutput::default());
    assert_eq!(codes_of(&result), vec![codes::SHADER_MODEL.0]);
    assert_eq!(program[mad].ty, Some(fvec(4)));
}

#[test]
fn intrinsic_arity_is_checked() {
    let mut b = ProgramBuilder::new();
    let x = b.float(1.0);
    let call = b.call("dot", vec![x]);
    let stmt = b.expr_stmt(call);
    fragment_main(&mut b, vec![], vec![stmt]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::INTRINSIC_ARGS.0]);
}

// ── Statements and control flow ─────────────────────────────────────────────

#[test]
fn discard_outside_fragment_shader_is_rejected() {
    let mut b = ProgramBuilder::new();
    let discard = b.ctrl(CtrlTransfer::Discard);
    let zero = b.float(0.0);
    let value = b.construct(fvec(4), vec![zero]);
    let ret = b.ret(Some(value));
    let body = b.block(vec![discard, ret]);
    let main = b.entry_function("main", fvec(4), "SV_Position", vec![], body);
    b.global(main);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Vertex);
    assert_eq!(codes_of(&result), vec![codes::INVALID_CONTEXT.0]);
}

#[test]
fn break_needs_an_enclosing_loop() {
    let mut b = ProgramBuilder::new();
    let stray = b.ctrl(CtrlTransfer::Break);
    let inner_break = b.ctrl(CtrlTransfer::Break);
    let loop_body = b.block(vec![inner_break]);
    let cond = b.boolean(true);
    let looped = b.while_loop(cond, loop_body);
    fragment_main(&mut b, vec![], vec![stray, looped]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::INVALID_CONTEXT.0]);
    assert_eq!(program[stray].span, result.diagnostics[0].span.unwrap());
}

#[test]
fn value_function_must_return_on_every_path() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", TypeDenoter::float());
    let x_ref = b.name("x");
    let zero = b.float(0.0);
    let cond = b.binary(BinaryOp::Gt, x_ref, zero);
    let x_ret = b.name("x");
    let early = b.ret(Some(x_ret));
    let guarded = b.if_else(cond, early, None);
    let body = b.block(vec![guarded]);
    let g = b.function("g", TypeDenoter::float(), vec![x], Some(body));
    b.global(g);
    fragment_main(&mut b, vec![], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::MISSING_RETURN.0]);
}

#[test]
fn constant_true_loop_satisfies_return() {
    let mut b = ProgramBuilder::new();
    let x = b.var("x", TypeDenoter::float());
    let x_ref = b.name("x");
    let inner = b.ret(Some(x_ref));
    let loop_body = b.block(vec![inner]);
    let forever = b.boolean(true);
    let looped = b.while_loop(forever, loop_body);
    let body = b.block(vec![looped]);
    let spin = b.function("spin", TypeDenoter::float(), vec![x], Some(body));
    b.global(spin);

    let y = b.var("y", TypeDenoter::float());
    let y_ref = b.name("y");
    let inner = b.ret(Some(y_ref));
    let loop_body = b.block(vec![inner]);
    let never = b.boolean(false);
    let bounded = b.while_loop(never, loop_body);
    let body = b.block(vec![bounded]);
    let stop = b.function("stop", TypeDenoter::float(), vec![y], Some(body));
    b.global(stop);
    fragment_main(&mut b, vec![], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert_eq!(codes_of(&result), vec![codes::MISSING_RETURN.0]);
    assert!(result.diagnostics[0].message.contains("stop"), "{:?}", result.diagnostics);
}

#[test]
fn null_loop_body_and_useless_statement_warn() {
    let mut b = ProgramBuilder::new();
    let cond = b.boolean(false);
    let empty = b.null();
    let looped = b.while_loop(cond, empty);
    let lit = b.int(4);
    let useless = b.expr_stmt(lit);
    fragment_main(&mut b, vec![], vec![looped, useless]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success);
    assert_eq!(
        codes_of(&result),
        vec![codes::NULL_STATEMENT.0, codes::NO_EFFECT.0]
    );
}

#[test]
fn returns_in_entry_point_are_annotated() {
    let mut b = ProgramBuilder::new();
    let main = fragment_main(&mut b, vec![], vec![]);
    let mut program = b.finish();

    let result = decorate(&mut program, ShaderTarget::Fragment);
    assert!(result.success);
    let body = program.function(main).unwrap().body.unwrap();
    let StmtKind::CodeBlock(stmts) = &program[body].kind else {
        panic!("body is not a block");
    };
    match program[stmts[0]].kind {
        StmtKind::Return {
            end_of_function,
            in_entry_point,
            ..
        } => {
            assert!(end_of_function);
            assert!(in_entry_point);
        }
        ref other => panic!("unexpected {:?}", other),
    }
}
