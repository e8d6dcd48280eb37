//! Visitor traversal over parsed files: read-only collection, pruning,
//! in-place rewriting and statement insertion through cursors.

use ego::parser::ast::*;
use ego::span::Spanned;
use ego::visit::scope_tracker::ScopeTracker;
use ego::visit::{
    walk_decl, walk_expr, walk_stmt_mut, Cursor, NotInList, VisitMut, Visitor, walk_expr_mut,
};
use pretty_assertions::assert_eq;

fn parse(src: &str) -> File {
    ego::parse(src).unwrap_or_else(|e| panic!("{}", e.located(src, "test.ego")))
}

const PROGRAM: &str = "package main

import \"fmt\"

func add(a, b int) int {
\treturn a + b*2
}

func main() {
\tx := add(1, 2)
\tf := func(n int) int {
\t\treturn n + 3
\t}
\tfmt.Println(x, f(4))
}
";

#[test]
fn counts_literals_in_nested_expressions() {
    struct LitCounter {
        count: usize,
    }

    impl Visitor for LitCounter {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Expr::BasicLit { .. } = expr.node {
                self.count += 1;
            }
            walk_expr(self, expr);
        }
    }

    let mut counter = LitCounter { count: 0 };
    counter.visit_file(&parse(PROGRAM));
    // 2, 1, 2, 3, 4
    assert_eq!(counter.count, 5);
}

#[test]
fn collects_called_names_in_source_order() {
    #[derive(Default)]
    struct Calls {
        names: Vec<String>,
    }

    impl Visitor for Calls {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Expr::Call { func, .. } = &expr.node {
                match &func.node {
                    Expr::Ident(name) => self.names.push(name.clone()),
                    Expr::Selector { field, .. } => self.names.push(field.node.clone()),
                    _ => {}
                }
            }
            walk_expr(self, expr);
        }
    }

    let mut calls = Calls::default();
    calls.visit_file(&parse(PROGRAM));
    assert_eq!(calls.names, vec!["add", "Println", "f"]);
}

#[test]
fn skipping_the_walk_prunes_closures() {
    #[derive(Default)]
    struct TopLevelReturns {
        count: usize,
    }

    impl Visitor for TopLevelReturns {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            if let Stmt::Return(_) = stmt.node {
                self.count += 1;
            }
            ego::visit::walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if let Expr::FuncLit { .. } = expr.node {
                return;
            }
            walk_expr(self, expr);
        }
    }

    let mut visitor = TopLevelReturns::default();
    visitor.visit_file(&parse(PROGRAM));
    assert_eq!(visitor.count, 1);
}

#[test]
fn declared_names_are_reported() {
    #[derive(Default)]
    struct Names {
        names: Vec<String>,
    }

    impl Visitor for Names {
        fn visit_name(&mut self, name: &Spanned<String>) {
            self.names.push(name.node.clone());
        }
    }

    let mut names = Names::default();
    names.visit_file(&parse(PROGRAM));
    assert_eq!(names.names, vec!["main", "add", "a", "b", "main", "n", "Println"]);
}

#[test]
fn scope_tracker_follows_function_nesting() {
    #[derive(Default)]
    struct Depths {
        funcs: ScopeTracker<String>,
        max_depth: usize,
        seen: Vec<(String, usize)>,
    }

    impl Visitor for Depths {
        fn visit_decl(&mut self, decl: &Spanned<Decl>) {
            if let Decl::Func(func) = &decl.node {
                self.funcs.push(func.name.node.clone());
                walk_decl(self, decl);
                self.funcs.pop();
            } else {
                walk_decl(self, decl);
            }
        }

        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            match &expr.node {
                Expr::FuncLit { .. } => {
                    self.funcs.push("closure".to_string());
                    self.max_depth = self.max_depth.max(self.funcs.depth());
                    walk_expr(self, expr);
                    self.funcs.pop();
                }
                Expr::BasicLit { value, .. } => {
                    let owner = self.funcs.current().cloned().unwrap_or_default();
                    self.seen.push((format!("{owner}:{value}"), self.funcs.depth()));
                }
                _ => walk_expr(self, expr),
            }
        }
    }

    let mut depths = Depths::default();
    depths.visit_file(&parse(PROGRAM));
    assert_eq!(depths.max_depth, 2);
    assert!(depths.funcs.is_empty());
    assert_eq!(
        depths.seen,
        vec![
            ("add:2".to_string(), 1),
            ("main:1".to_string(), 1),
            ("main:2".to_string(), 1),
            ("closure:3".to_string(), 2),
            ("main:4".to_string(), 1),
        ]
    );
}

// ── VisitMut ────────────────────────────────────────────────────────

#[test]
fn renames_identifiers_in_place() {
    struct Rename;

    impl VisitMut for Rename {
        type Error = std::convert::Infallible;

        fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) -> Result<(), Self::Error> {
            if let Expr::Ident(name) = &mut expr.node {
                if name == "x" {
                    *name = "total".to_string();
                }
            }
            walk_expr_mut(self, expr)
        }
    }

    let src = "package main\n\nfunc main() {\n\tx := 1\n\tprint(x + x)\n}\n";
    let mut file = parse(src);
    Rename.visit_file_mut(&mut file).unwrap();
    assert_eq!(
        ego::pretty_print(&file, src),
        "package main\n\nfunc main() {\n\ttotal := 1\n\tprint(total + total)\n}\n"
    );
}

#[test]
fn inserted_statements_follow_and_are_not_revisited() {
    struct Trace {
        visited: usize,
    }

    impl VisitMut for Trace {
        type Error = NotInList;

        fn visit_stmt_mut(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Self::Error> {
            self.visited += 1;
            if let Stmt::Expr(_) = cursor.node().node {
                let call = Expr::Call {
                    func: Box::new(Spanned::dummy(Expr::ident("trace"))),
                    args: Vec::new(),
                    ellipsis: false,
                };
                cursor.insert_after(Spanned::dummy(Stmt::Expr(Spanned::dummy(call))))?;
            }
            walk_stmt_mut(self, cursor.node_mut())
        }
    }

    let src = "package main\n\nfunc main() {\n\ta()\n\tb()\n}\n";
    let mut file = parse(src);
    let mut trace = Trace { visited: 0 };
    trace.visit_file_mut(&mut file).unwrap();
    assert_eq!(trace.visited, 2);
    assert_eq!(
        ego::pretty_print(&file, src),
        "package main\n\nfunc main() {\n\ta()\n\ttrace()\n\tb()\n\ttrace()\n}\n"
    );
}

#[test]
fn header_slots_refuse_insertion() {
    struct InsertEverywhere;

    impl VisitMut for InsertEverywhere {
        type Error = NotInList;

        fn visit_stmt_mut(&mut self, cursor: &mut Cursor<'_>) -> Result<(), Self::Error> {
            if matches!(cursor.node().node, Stmt::Assign { .. }) {
                cursor.insert_after(Spanned::dummy(Stmt::Break))?;
            }
            walk_stmt_mut(self, cursor.node_mut())
        }
    }

    let src = "package main\n\nfunc main() {\n\tif v := get(); v {\n\t}\n}\n";
    let mut file = parse(src);
    assert_eq!(InsertEverywhere.visit_file_mut(&mut file), Err(NotInList));
}

#[test]
fn visitor_error_stops_traversal() {
    struct FirstTry {
        seen: usize,
    }

    impl VisitMut for FirstTry {
        type Error = String;

        fn visit_expr_mut(&mut self, expr: &mut Spanned<Expr>) -> Result<(), Self::Error> {
            if let Expr::Try(_) = expr.node {
                self.seen += 1;
                return Err(format!("try #{}", self.seen));
            }
            walk_expr_mut(self, expr)
        }
    }

    let src = "package main\n\nfunc main() {\n\ta()?\n\tb()?\n}\n";
    let mut file = parse(src);
    let mut visitor = FirstTry { seen: 0 };
    assert_eq!(visitor.visit_file_mut(&mut file), Err("try #1".to_string()));
    assert_eq!(visitor.seen, 1);
}
