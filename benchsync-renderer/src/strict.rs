//! Undefined-variable check for mapping templates.
//!
//! Tera only fails on a missing variable when it is printed. Inside
//! `{% if %}`, `default(...)` and tests other than `defined`/`undefined` a
//! missing variable is silently falsy. Every identifier a template (and the
//! templates it includes or extends) references is collected once at engine
//! construction and looked up in the rendering context before each render.

use std::collections::BTreeSet;

use tera::ast::{Expr, ExprVal, Node};
use tera::{Tera, Value};

/// Identifiers referenced by `name`, minus locals bound by `for`, `set` and
/// macro arguments. Sorted, de-duplicated.
pub(crate) fn referenced_variables(tera: &Tera, name: &str) -> tera::Result<Vec<String>> {
    let mut walker = Walker::default();
    walker.template(tera, name)?;
    Ok(walker
        .idents
        .into_iter()
        .filter(|ident| !walker.locals.contains(root(ident)))
        .collect())
}

/// First variable in `idents` that does not resolve in `context`.
pub(crate) fn first_undefined<'a>(idents: &'a [String], context: &Value) -> Option<&'a str> {
    idents
        .iter()
        .map(String::as_str)
        .find(|ident| lookup(context, lookup_path(ident)).is_none())
}

fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |target, key| match target {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// `record.address[0].city` → `record`.
fn root(ident: &str) -> &str {
    ident
        .split(|c: char| c == '.' || c == '[')
        .next()
        .unwrap_or(ident)
}

/// The dotted prefix before any `[...]` subscript.
fn lookup_path(ident: &str) -> &str {
    ident.split('[').next().unwrap_or(ident)
}

#[derive(Default)]
struct Walker {
    idents: BTreeSet<String>,
    locals: BTreeSet<String>,
    visited: BTreeSet<String>,
}

impl Walker {
    fn template(&mut self, tera: &Tera, name: &str) -> tera::Result<()> {
        if !self.visited.insert(name.to_string()) {
            return Ok(());
        }
        let template = tera.get_template(name)?;
        for parent in &template.parents {
            self.template(tera, parent)?;
        }
        for def in template.macros.values() {
            self.locals.extend(def.args.keys().cloned());
            self.nodes(tera, &def.body)?;
        }
        self.nodes(tera, &template.ast)
    }

    fn nodes(&mut self, tera: &Tera, nodes: &[Node]) -> tera::Result<()> {
        for node in nodes {
            match node {
                Node::VariableBlock(_, expr) => self.expr(expr),
                Node::Set(_, set) => {
                    self.locals.insert(set.key.clone());
                    self.expr(&set.value);
                }
                Node::Include(_, names, ignore_missing) => {
                    for name in names {
                        match self.template(tera, name) {
                            Err(_) if *ignore_missing => {}
                            other => other?,
                        }
                    }
                }
                Node::FilterSection(_, section, _) => {
                    section.filter.args.values().for_each(|e| self.expr(e));
                    self.nodes(tera, &section.body)?;
                }
                Node::Block(_, block, _) => self.nodes(tera, &block.body)?,
                Node::Forloop(_, forloop, _) => {
                    self.locals.insert("loop".to_string());
                    self.locals.insert(forloop.value.clone());
                    if let Some(key) = &forloop.key {
                        self.locals.insert(key.clone());
                    }
                    self.expr(&forloop.container);
                    self.nodes(tera, &forloop.body)?;
                    if let Some(empty) = &forloop.empty_body {
                        self.nodes(tera, empty)?;
                    }
                }
                Node::If(branches, _) => {
                    for (_, cond, body) in &branches.conditions {
                        self.expr(cond);
                        self.nodes(tera, body)?;
                    }
                    if let Some((_, body)) = &branches.otherwise {
                        self.nodes(tera, body)?;
                    }
                }
                Node::MacroDefinition(..)
                | Node::Super
                | Node::Text(_)
                | Node::Extends(..)
                | Node::ImportMacro(..)
                | Node::Raw(..)
                | Node::Break(_)
                | Node::Continue(_)
                | Node::Comment(..) => {}
            }
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) {
        self.val(&expr.val);
        for filter in &expr.filters {
            filter.args.values().for_each(|e| self.expr(e));
        }
    }

    fn val(&mut self, val: &ExprVal) {
        match val {
            ExprVal::Ident(ident) => {
                if ident != "__tera_context" {
                    self.idents.insert(ident.clone());
                }
            }
            ExprVal::Math(math) => {
                self.expr(&math.lhs);
                self.expr(&math.rhs);
            }
            ExprVal::Logic(logic) => {
                self.expr(&logic.lhs);
                self.expr(&logic.rhs);
            }
            ExprVal::Test(test) => {
                if test.name != "defined" && test.name != "undefined" {
                    self.idents.insert(test.ident.clone());
                }
                test.args.iter().for_each(|e| self.expr(e));
            }
            ExprVal::MacroCall(call) => call.args.values().for_each(|e| self.expr(e)),
            ExprVal::FunctionCall(call) => call.args.values().for_each(|e| self.expr(e)),
            ExprVal::Array(items) => items.iter().for_each(|e| self.expr(e)),
            ExprVal::StringConcat(concat) => concat.values.iter().for_each(|v| self.val(v)),
            ExprVal::In(inside) => {
                self.expr(&inside.lhs);
                self.expr(&inside.rhs);
            }
            ExprVal::String(_) | ExprVal::Int(_) | ExprVal::Float(_) | ExprVal::Bool(_) => {}
        }
    }
}
