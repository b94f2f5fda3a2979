// dump.rs — Deterministic text rendering of a decorated program
//
// Lists the entry-point interface, every declaration with its annotations,
// and every resolved identifier and call, in arena order. Used by the
// `--emit dump` driver mode and by snapshot tests.
//
// Preconditions: none; undecorated programs render with `?` placeholders.
// Postconditions: output depends only on the program contents.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt;

use crate::ast::*;
use crate::id::{DeclId, ExprId};

/// Display adapter over a program.
pub struct Dump<'p>(pub &'p Program);

/// Render `program` as text.
pub fn dump(program: &Program) -> String {
    Dump(program).to_string()
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.0;
        match program.entry_point {
            Some(entry) => {
                writeln!(f, "entry {} ({})", program.name_of(entry), entry)?;
                if let Some(func) = program.function(entry) {
                    for binding in &func.entry_inputs {
                        writeln!(f, "  in  {} <- {}", binding.semantic, binding_source(program, binding))?;
                    }
                    for binding in &func.entry_outputs {
                        writeln!(f, "  out {} <- {}", binding.semantic, binding_source(program, binding))?;
                    }
                }
            }
            None => writeln!(f, "entry <none>")?,
        }

        writeln!(f, "decls")?;
        for i in 0..program.decls.len() {
            write_decl(f, program, DeclId::from_index(i))?;
        }

        writeln!(f, "uses")?;
        for i in 0..program.exprs.len() {
            write_use(f, program, ExprId::from_index(i))?;
        }
        Ok(())
    }
}

fn binding_source(program: &Program, binding: &EntryBinding) -> String {
    match binding.decl {
        Some(decl) => format!("{} {}", decl, program.name_of(decl)),
        None => "return".to_string(),
    }
}

fn io_text(io: IoFlags) -> Option<&'static str> {
    match (io.input, io.output) {
        (true, true) => Some("io=inout"),
        (true, false) => Some("io=in"),
        (false, true) => Some("io=out"),
        (false, false) => None,
    }
}

fn write_decl(f: &mut fmt::Formatter<'_>, program: &Program, id: DeclId) -> fmt::Result {
    let decl = &program[id];
    let mut flags: Vec<String> = Vec::new();
    let head = match &decl.kind {
        DeclKind::Var(var) => {
            let ty = var
                .resolved_type
                .as_ref()
                .map_or_else(|| "?".to_string(), ToString::to_string);
            if let Some(sem) = var.binding_semantic() {
                flags.push(format!("semantic={}", sem));
            }
            flags.extend(io_text(var.io).map(str::to_string));
            if var.is_global {
                flags.push("global".to_string());
            }
            format!("var {}: {}", decl.ident.name, ty)
        }
        DeclKind::Function(func) => {
            let ret = func
                .resolved_return
                .as_ref()
                .map_or_else(|| "?".to_string(), ToString::to_string);
            if func.is_entry_point {
                flags.push("entry".to_string());
            }
            if func.is_prototype() {
                flags.push("prototype".to_string());
            }
            let params: Vec<String> = func.params.iter().map(ToString::to_string).collect();
            format!("function {}({}) -> {}", decl.ident.name, params.join(", "), ret)
        }
        DeclKind::Struct(strukt) => {
            if let Some(base) = strukt.base_decl {
                flags.push(format!("base={}", base));
            }
            flags.extend(io_text(strukt.io).map(str::to_string));
            if !strukt.system_value_members.is_empty() {
                let members: Vec<String> =
                    strukt.system_value_members.iter().map(ToString::to_string).collect();
                flags.push(format!("sv=[{}]", members.join(", ")));
            }
            format!("struct {}", decl.ident.name)
        }
        DeclKind::Alias(alias) => {
            let ty = alias
                .resolved_type
                .as_ref()
                .map_or_else(|| "?".to_string(), ToString::to_string);
            format!("alias {} = {}", decl.ident.name, ty)
        }
        DeclKind::Texture(t) => format!("texture {}: {}", decl.ident.name, t.kind.name()),
        DeclKind::Sampler(s) => format!("sampler {}: {}", decl.ident.name, s.kind.name()),
        DeclKind::Buffer(b) => format!("cbuffer {} ({} members)", decl.ident.name, b.members.len()),
    };
    if decl.reachable {
        flags.push("reachable".to_string());
    }
    if flags.is_empty() {
        writeln!(f, "  {} {}", id, head)
    } else {
        writeln!(f, "  {} {} [{}]", id, head, flags.join(", "))
    }
}

fn write_use(f: &mut fmt::Formatter<'_>, program: &Program, id: ExprId) -> fmt::Result {
    let expr = &program[id];
    let ty = expr
        .ty
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string);
    match &expr.kind {
        ExprKind::Ident { ident, symbol } => {
            let target = match symbol {
                SymbolRef::Decl(d) => d.to_string(),
                SymbolRef::Error => "<error>".to_string(),
                SymbolRef::Unresolved => "?".to_string(),
            };
            writeln!(f, "  {} {} -> {} : {}", id, ident.name, target, ty)
        }
        ExprKind::Call(call) => {
            let callee = match &call.callee {
                Callee::Ident(ident) => format!("{}(..)", ident.name),
                Callee::Method { object, name } => format!("{}.{}(..)", object, name.name),
                Callee::Constructor(spec) => format!("{}(..)", spec.denoter),
            };
            let target = match &call.target {
                CallTarget::Function(d) => format!("function {}", d),
                CallTarget::Intrinsic(i) => format!("intrinsic {:?}", i),
                CallTarget::Constructor(t) => format!("constructor {}", t),
                CallTarget::Error => "<error>".to_string(),
                CallTarget::Unresolved => "?".to_string(),
            };
            writeln!(f, "  {} {} -> {} : {}", id, callee, target, ty)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::types::TypeDenoter;

    #[test]
    fn undecorated_program_uses_placeholders() {
        let mut b = ProgramBuilder::new();
        let x = b.var("x", TypeDenoter::float());
        b.global(x);
        b.name("x");
        let text = dump(&b.finish());
        assert!(text.starts_with("entry <none>\n"));
        assert!(text.contains("d0 var x: ?"));
        assert!(text.contains("x -> ? : ?"));
    }
}
