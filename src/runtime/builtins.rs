use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use crate::stdlib::{
    cluster::ClusterNet, fs::FileStore, math, matrix, mlp::Mlp, plot::PlotCanvas, regression,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type NativeFn = Box<dyn Fn(Vec<Value>) -> RuntimeResult<Value>>;

/// Printed lines and rendered plots, mirrored here so callers can observe
/// output without scraping stdout.
pub type OutputLog = Rc<RefCell<Vec<String>>>;

/// Name-to-native-callable table, assembled once at interpreter construction
/// by scanning the stdlib modules in a fixed priority order. The first module
/// exporting a name wins, and the table never changes afterwards.
pub struct Registry {
    entries: HashMap<String, NativeFn>,
}

impl Registry {
    pub fn new(
        canvas: Rc<RefCell<PlotCanvas>>,
        store: Rc<RefCell<FileStore>>,
        output: OutputLog,
    ) -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.install_math();
        registry.install_matrix();
        registry.install_plot(canvas, output);
        registry.install_fs(store);
        registry.install_regression();
        registry.install_mlp();
        registry.install_cluster();
        registry
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn install(&mut self, name: &str, f: impl Fn(Vec<Value>) -> RuntimeResult<Value> + 'static) {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Box::new(f));
    }

    fn install_math(&mut self) {
        self.install("factorial", |args| {
            expect_arity("factorial", &args, 1)?;
            math::factorial(number_arg("factorial", &args, 0)?).map(Value::Number)
        });
        self.install("power", |args| {
            expect_arity("power", &args, 2)?;
            let base = number_arg("power", &args, 0)?;
            let exponent = number_arg("power", &args, 1)?;
            Ok(Value::Number(math::power(base, exponent)))
        });
        self.install("reduce_angle", |args| {
            expect_arity("reduce_angle", &args, 1)?;
            Ok(Value::Number(math::reduce_angle(number_arg(
                "reduce_angle",
                &args,
                0,
            )?)))
        });
        self.install("sin", |args| {
            expect_arity("sin", &args, 1)?;
            Ok(Value::Number(math::sin(number_arg("sin", &args, 0)?)))
        });
        self.install("cos", |args| {
            expect_arity("cos", &args, 1)?;
            Ok(Value::Number(math::cos(number_arg("cos", &args, 0)?)))
        });
        self.install("tan", |args| {
            expect_arity("tan", &args, 1)?;
            math::tan(number_arg("tan", &args, 0)?).map(Value::Number)
        });
        self.install("sqrt", |args| {
            expect_arity("sqrt", &args, 1)?;
            math::sqrt(number_arg("sqrt", &args, 0)?).map(Value::Number)
        });
        self.install("pi", |args| {
            expect_arity("pi", &args, 0)?;
            Ok(Value::Number(math::PI))
        });
        self.install("e", |args| {
            expect_arity("e", &args, 0)?;
            Ok(Value::Number(math::E))
        });
    }

    fn install_matrix(&mut self) {
        self.install("shape", |args| {
            expect_arity("shape", &args, 1)?;
            let m = matrix_arg("shape", &args, 0)?;
            let (rows, cols) = matrix::shape(&m);
            Ok(Value::List(vec![
                Value::Number(rows as f64),
                Value::Number(cols as f64),
            ]))
        });
        self.install("zeros", |args| {
            expect_arity("zeros", &args, 2)?;
            let rows = count_arg("zeros", &args, 0)?;
            let cols = count_arg("zeros", &args, 1)?;
            Ok(matrix_value(matrix::zeros(rows, cols)))
        });
        self.install("mat_add", |args| {
            expect_arity("mat_add", &args, 2)?;
            let a = matrix_arg("mat_add", &args, 0)?;
            let b = matrix_arg("mat_add", &args, 1)?;
            matrix::mat_add(&a, &b).map(matrix_value)
        });
        self.install("mat_sub", |args| {
            expect_arity("mat_sub", &args, 2)?;
            let a = matrix_arg("mat_sub", &args, 0)?;
            let b = matrix_arg("mat_sub", &args, 1)?;
            matrix::mat_sub(&a, &b).map(matrix_value)
        });
        self.install("mat_mul", |args| {
            expect_arity("mat_mul", &args, 2)?;
            let a = matrix_arg("mat_mul", &args, 0)?;
            let b = matrix_arg("mat_mul", &args, 1)?;
            matrix::mat_mul(&a, &b).map(matrix_value)
        });
        self.install("mat_transpose", |args| {
            expect_arity("mat_transpose", &args, 1)?;
            let m = matrix_arg("mat_transpose", &args, 0)?;
            Ok(matrix_value(matrix::mat_transpose(&m)))
        });
        self.install("mat_identity", |args| {
            expect_arity("mat_identity", &args, 1)?;
            let n = count_arg("mat_identity", &args, 0)?;
            Ok(matrix_value(matrix::mat_identity(n)))
        });
        self.install("mat_inverse", |args| {
            expect_arity("mat_inverse", &args, 1)?;
            let m = matrix_arg("mat_inverse", &args, 0)?;
            matrix::mat_inverse(&m).map(matrix_value)
        });
    }

    fn install_plot(&mut self, canvas: Rc<RefCell<PlotCanvas>>, output: OutputLog) {
        let shared = Rc::clone(&canvas);
        self.install("figure", move |args| {
            match args.len() {
                0 => shared.borrow_mut().figure(50, 15),
                2 => {
                    let width = count_arg("figure", &args, 0)?;
                    let height = count_arg("figure", &args, 1)?;
                    shared.borrow_mut().figure(width, height);
                }
                other => {
                    return Err(RuntimeError::TypeMismatch {
                        message: format!("figure() expects 0 or 2 arguments, got {}", other),
                    });
                }
            }
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("plot", move |args| {
            let (xs, ys) = match args.len() {
                1 => {
                    let ys = vector_arg("plot", &args, 0)?;
                    let xs = (0..ys.len()).map(|i| i as f64).collect();
                    (xs, ys)
                }
                2 => (vector_arg("plot", &args, 0)?, vector_arg("plot", &args, 1)?),
                other => {
                    return Err(RuntimeError::TypeMismatch {
                        message: format!("plot() expects 1 or 2 arguments, got {}", other),
                    });
                }
            };
            shared.borrow_mut().plot(xs, ys, None)?;
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("scatter", move |args| {
            expect_arity("scatter", &args, 2)?;
            let xs = vector_arg("scatter", &args, 0)?;
            let ys = vector_arg("scatter", &args, 1)?;
            shared.borrow_mut().scatter(xs, ys, None)?;
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("title", move |args| {
            expect_arity("title", &args, 1)?;
            shared.borrow_mut().set_title(args[0].to_string());
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("xlabel", move |args| {
            expect_arity("xlabel", &args, 1)?;
            shared.borrow_mut().set_xlabel(args[0].to_string());
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("ylabel", move |args| {
            expect_arity("ylabel", &args, 1)?;
            shared.borrow_mut().set_ylabel(args[0].to_string());
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        let log = Rc::clone(&output);
        self.install("show", move |args| {
            expect_arity("show", &args, 0)?;
            let rendered = shared.borrow().render();
            print!("{rendered}");
            log.borrow_mut().push(rendered);
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&canvas);
        self.install("clf", move |args| {
            expect_arity("clf", &args, 0)?;
            shared.borrow_mut().clf();
            Ok(Value::Unit)
        });

        let shared = canvas;
        self.install("close", move |args| {
            expect_arity("close", &args, 0)?;
            shared.borrow_mut().close();
            Ok(Value::Unit)
        });
    }

    fn install_fs(&mut self, store: Rc<RefCell<FileStore>>) {
        let shared = Rc::clone(&store);
        self.install("write_text", move |args| {
            expect_arity("write_text", &args, 2)?;
            let path = string_arg("write_text", &args, 0)?;
            shared.borrow_mut().write_text(&path, &args[1].to_string());
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&store);
        self.install("append_text", move |args| {
            expect_arity("append_text", &args, 2)?;
            let path = string_arg("append_text", &args, 0)?;
            shared.borrow_mut().append_text(&path, &args[1].to_string());
            Ok(Value::Unit)
        });

        let shared = Rc::clone(&store);
        self.install("read_text", move |args| {
            expect_arity("read_text", &args, 1)?;
            let path = string_arg("read_text", &args, 0)?;
            shared.borrow().read_text(&path).map(Value::String)
        });

        let shared = store;
        self.install("read_lines", move |args| {
            expect_arity("read_lines", &args, 1)?;
            let path = string_arg("read_lines", &args, 0)?;
            let lines = shared.borrow().read_lines(&path)?;
            Ok(Value::List(lines.into_iter().map(Value::String).collect()))
        });
    }

    fn install_regression(&mut self) {
        self.install("linear_fit", |args| {
            expect_arity("linear_fit", &args, 2)?;
            let xs = vector_arg("linear_fit", &args, 0)?;
            let ys = vector_arg("linear_fit", &args, 1)?;
            let (m, b) = regression::linear_fit(&xs, &ys)?;
            Ok(Value::List(vec![Value::Number(m), Value::Number(b)]))
        });
        self.install("linear_predict", |args| {
            expect_arity("linear_predict", &args, 2)?;
            let xs = vector_arg("linear_predict", &args, 0)?;
            let params = vector_arg("linear_predict", &args, 1)?;
            if params.len() != 2 {
                return Err(RuntimeError::DomainError {
                    message: "linear_predict() expects params of the form [m, b]".into(),
                });
            }
            Ok(number_list(&regression::linear_predict(
                &xs, params[0], params[1],
            )))
        });
    }

    fn install_mlp(&mut self) {
        self.install("create_mlp", |args| {
            expect_arity("create_mlp", &args, 3)?;
            let input_dim = count_arg("create_mlp", &args, 0)?;
            let hidden_dim = count_arg("create_mlp", &args, 1)?;
            let output_dim = count_arg("create_mlp", &args, 2)?;
            Ok(Value::Mlp(Rc::new(RefCell::new(Mlp::new(
                input_dim, hidden_dim, output_dim,
            )))))
        });
        self.install("train_mlp", |args| {
            expect_arity("train_mlp", &args, 5)?;
            let model = mlp_arg("train_mlp", &args, 0)?;
            let inputs = matrix_arg("train_mlp", &args, 1)?;
            let labels = vector_arg("train_mlp", &args, 2)?;
            let lr = number_arg("train_mlp", &args, 3)?;
            let epochs = count_arg("train_mlp", &args, 4)?;
            model.borrow_mut().train(&inputs, &labels, lr, epochs)?;
            Ok(Value::Mlp(model))
        });
        self.install("classify_mlp", |args| {
            expect_arity("classify_mlp", &args, 2)?;
            let model = mlp_arg("classify_mlp", &args, 0)?;
            let inputs = matrix_arg("classify_mlp", &args, 1)?;
            let labels = model.borrow_mut().predict(&inputs)?;
            Ok(number_list(&labels))
        });
        self.install("predict_mlp", |args| {
            expect_arity("predict_mlp", &args, 2)?;
            let model = mlp_arg("predict_mlp", &args, 0)?;
            let inputs = matrix_arg("predict_mlp", &args, 1)?;
            let labels = model.borrow_mut().predict(&inputs)?;
            Ok(number_list(&labels))
        });
        self.install("predict_real_mlp", |args| {
            expect_arity("predict_real_mlp", &args, 2)?;
            let model = mlp_arg("predict_real_mlp", &args, 0)?;
            let inputs = matrix_arg("predict_real_mlp", &args, 1)?;
            let outputs = model.borrow_mut().predict_real(&inputs)?;
            let values = outputs
                .into_iter()
                .map(|row| {
                    if row.len() == 1 {
                        Value::Number(row[0])
                    } else {
                        number_list(&row)
                    }
                })
                .collect();
            Ok(Value::List(values))
        });
    }

    fn install_cluster(&mut self) {
        self.install("create_cluster_net", |args| {
            expect_arity("create_cluster_net", &args, 2)?;
            let input_dim = count_arg("create_cluster_net", &args, 0)?;
            let num_clusters = count_arg("create_cluster_net", &args, 1)?;
            Ok(Value::ClusterNet(Rc::new(RefCell::new(ClusterNet::new(
                input_dim,
                num_clusters,
            )))))
        });
        self.install("train_cluster_net", |args| {
            expect_arity("train_cluster_net", &args, 4)?;
            let model = cluster_arg("train_cluster_net", &args, 0)?;
            let inputs = matrix_arg("train_cluster_net", &args, 1)?;
            let lr = number_arg("train_cluster_net", &args, 2)?;
            let epochs = count_arg("train_cluster_net", &args, 3)?;
            model.borrow_mut().train(&inputs, lr, epochs)?;
            Ok(Value::ClusterNet(model))
        });
        self.install("predict_cluster", |args| {
            expect_arity("predict_cluster", &args, 2)?;
            let model = cluster_arg("predict_cluster", &args, 0)?;
            let inputs = matrix_arg("predict_cluster", &args, 1)?;
            let labels = model.borrow().predict(&inputs)?;
            Ok(Value::List(
                labels
                    .into_iter()
                    .map(|l| Value::Number(l as f64))
                    .collect(),
            ))
        });
    }
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> RuntimeResult<()> {
    if args.len() != expected {
        return Err(RuntimeError::TypeMismatch {
            message: format!(
                "{}() expects {} argument(s), got {}",
                name,
                expected,
                args.len()
            ),
        });
    }
    Ok(())
}

fn argument_error(name: &str, idx: usize, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::TypeMismatch {
        message: format!(
            "{}() expects {} for argument {}, got {}",
            name,
            expected,
            idx + 1,
            got.type_name()
        ),
    }
}

fn arg<'a>(name: &str, args: &'a [Value], idx: usize) -> RuntimeResult<&'a Value> {
    args.get(idx).ok_or_else(|| RuntimeError::TypeMismatch {
        message: format!("{}() is missing argument {}", name, idx + 1),
    })
}

pub(crate) fn number_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<f64> {
    match arg(name, args, idx)? {
        Value::Number(v) => Ok(*v),
        other => Err(argument_error(name, idx, "a number", other)),
    }
}

// Natural-number argument (sizes, epoch counts); fractional values truncate.
fn count_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<usize> {
    let v = number_arg(name, args, idx)?;
    if v < 0.0 {
        return Err(RuntimeError::DomainError {
            message: format!("{}() expects a non-negative count for argument {}", name, idx + 1),
        });
    }
    Ok(v as usize)
}

fn string_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<String> {
    match arg(name, args, idx)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(argument_error(name, idx, "a string", other)),
    }
}

pub(crate) fn vector_from_value(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(v) => Some(*v),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

pub(crate) fn matrix_from_value(value: &Value) -> Option<Vec<Vec<f64>>> {
    match value {
        Value::List(rows) => rows.iter().map(vector_from_value).collect(),
        _ => None,
    }
}

fn vector_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<Vec<f64>> {
    let value = arg(name, args, idx)?;
    vector_from_value(value).ok_or_else(|| argument_error(name, idx, "a list of numbers", value))
}

fn matrix_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<Vec<Vec<f64>>> {
    let value = arg(name, args, idx)?;
    matrix_from_value(value)
        .ok_or_else(|| argument_error(name, idx, "a list of number rows", value))
}

fn mlp_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<Rc<RefCell<Mlp>>> {
    match arg(name, args, idx)? {
        Value::Mlp(model) => Ok(Rc::clone(model)),
        other => Err(argument_error(name, idx, "an mlp model", other)),
    }
}

fn cluster_arg(name: &str, args: &[Value], idx: usize) -> RuntimeResult<Rc<RefCell<ClusterNet>>> {
    match arg(name, args, idx)? {
        Value::ClusterNet(model) => Ok(Rc::clone(model)),
        other => Err(argument_error(name, idx, "a cluster net", other)),
    }
}

pub(crate) fn number_list(values: &[f64]) -> Value {
    Value::List(values.iter().map(|v| Value::Number(*v)).collect())
}

pub(crate) fn matrix_value(m: Vec<Vec<f64>>) -> Value {
    Value::List(m.iter().map(|row| number_list(row)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> Registry {
        Registry::new(
            Rc::new(RefCell::new(PlotCanvas::new())),
            Rc::new(RefCell::new(FileStore::new())),
            Rc::new(RefCell::new(Vec::new())),
        )
    }

    #[test]
    fn registry_contains_every_module_surface() {
        let registry = test_registry();
        for name in [
            "factorial",
            "power",
            "sin",
            "cos",
            "tan",
            "sqrt",
            "shape",
            "zeros",
            "mat_add",
            "mat_sub",
            "mat_mul",
            "mat_transpose",
            "mat_identity",
            "mat_inverse",
            "figure",
            "plot",
            "scatter",
            "title",
            "xlabel",
            "ylabel",
            "show",
            "clf",
            "close",
            "write_text",
            "append_text",
            "read_text",
            "read_lines",
            "linear_fit",
            "linear_predict",
            "create_mlp",
            "train_mlp",
            "classify_mlp",
            "predict_mlp",
            "predict_real_mlp",
            "create_cluster_net",
            "train_cluster_net",
            "predict_cluster",
        ] {
            assert!(registry.contains(name), "missing builtin `{}`", name);
        }
    }

    #[test]
    fn builtins_check_arity() {
        let registry = test_registry();
        let sqrt = registry.get("sqrt").unwrap();
        assert!(matches!(
            sqrt(vec![]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn builtins_check_argument_types() {
        let registry = test_registry();
        let sin = registry.get("sin").unwrap();
        assert!(matches!(
            sin(vec![Value::String("x".into())]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn native_errors_surface_unchanged() {
        let registry = test_registry();
        let sqrt = registry.get("sqrt").unwrap();
        assert!(matches!(
            sqrt(vec![Value::Number(-1.0)]),
            Err(RuntimeError::DomainError { .. })
        ));
    }

    #[test]
    fn file_builtins_share_one_store() {
        let store = Rc::new(RefCell::new(FileStore::new()));
        let registry = Registry::new(
            Rc::new(RefCell::new(PlotCanvas::new())),
            Rc::clone(&store),
            Rc::new(RefCell::new(Vec::new())),
        );
        let write = registry.get("write_text").unwrap();
        write(vec![
            Value::String("a.txt".into()),
            Value::String("body".into()),
        ])
        .unwrap();
        assert_eq!(store.borrow().read_text("a.txt").unwrap(), "body");
    }

    #[test]
    fn show_records_rendered_plot_in_output_log() {
        let output: OutputLog = Rc::new(RefCell::new(Vec::new()));
        let registry = Registry::new(
            Rc::new(RefCell::new(PlotCanvas::new())),
            Rc::new(RefCell::new(FileStore::new())),
            Rc::clone(&output),
        );
        let show = registry.get("show").unwrap();
        show(vec![]).unwrap();
        assert_eq!(output.borrow().len(), 1);
        assert!(output.borrow()[0].contains("(empty plot)"));
    }
}
