use core::fmt::Display;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{Elem, Expr, FloatKind, Var};

/// A symbolic tensor: a shape of size expressions, an element type, and
/// either a placeholder binding or a named compute definition.
///
/// `Tensor` is a cheap handle; cloning shares the underlying record. Every
/// expression that indexes a tensor holds such a handle, so a tensor lives as
/// long as the program graph referencing it. Equality and hashing are by
/// identity, never by structure.
#[derive(Debug, Clone)]
pub struct Tensor {
    inner: Arc<TensorInner>,
}

#[derive(Debug)]
struct TensorInner {
    name: String,
    shape: Vec<Expr>,
    elem: Elem,
    kind: TensorKind,
}

/// How a tensor's elements are defined.
#[derive(Debug)]
pub enum TensorKind {
    /// An input declared by an upstream stage; elements are bound to a
    /// buffer at execution time.
    Placeholder,
    /// A named compute definition: `body` defines the element at the index
    /// given by `axes`.
    Compute { axes: Vec<Var>, body: Expr },
}

impl Tensor {
    /// Declare an input tensor.
    pub fn placeholder(name: impl Into<String>, shape: Vec<Expr>, elem: Elem) -> Tensor {
        Tensor {
            inner: Arc::new(TensorInner {
                name: name.into(),
                shape,
                elem,
                kind: TensorKind::Placeholder,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn shape(&self) -> &[Expr] {
        &self.inner.shape
    }

    pub fn ndim(&self) -> usize {
        self.inner.shape.len()
    }

    pub fn elem(&self) -> Elem {
        self.inner.elem
    }

    pub fn kind(&self) -> &TensorKind {
        &self.inner.kind
    }

    /// Read the element at `indices` as a scalar expression.
    pub fn index(&self, indices: Vec<Expr>) -> Expr {
        Expr::Access {
            tensor: self.clone(),
            indices,
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Tensor {}

impl Hash for Tensor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

impl Display for Tensor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}[", self.name(), self.elem())?;
        for (i, size) in self.shape().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{size}")?;
        }
        write!(f, "]")
    }
}

/// Declare a named compute definition over an index domain.
///
/// `f` receives one index expression per output dimension and returns the
/// scalar expression defining the element at that index. The element type is
/// derived from the body; when no type can be derived it falls back to `f32`.
pub fn compute<F>(shape: Vec<Expr>, f: F, name: impl Into<String>) -> Tensor
where
    F: Fn(&[Expr]) -> Expr,
{
    let axes: Vec<Var> = shape
        .iter()
        .enumerate()
        .map(|(i, extent)| Var::new(extent.clone(), format!("i{i}")))
        .collect();
    let indices: Vec<Expr> = axes.iter().cloned().map(Expr::Var).collect();
    let body = f(&indices);
    let elem = body.infer_elem().unwrap_or(Elem::Float(FloatKind::F32));

    Tensor {
        inner: Arc::new(TensorInner {
            name: name.into(),
            shape,
            elem,
            kind: TensorKind::Compute { axes, body },
        }),
    }
}
