//! Generic argument inference.
//!
//! A pure function of the method descriptor and the mapped argument types;
//! it needs no foreign runtime and keeps no state.
//!
//! For each generic parameter `T`, in declaration order:
//! 1. the first formal parameter whose declared type is exactly `T` binds
//!    `T` to the type of the argument in that position;
//! 2. failing that, the first formal parameter that mentions `T` inside a
//!    generic application (`IList<T>`) is matched structurally against its
//!    argument's type (`IList<Int32>` binds `T = Int32`);
//! 3. failing that, `T` stays unresolved.

use dynbind_reflect::{GenericParam, MethodDescriptor, Ty};

/// Infer the generic arguments of `method` from `arg_types`.
///
/// The result has one slot per generic parameter; `None` marks a parameter
/// that could not be inferred.
pub fn infer_generic_args(method: &MethodDescriptor, arg_types: &[Ty]) -> Vec<Option<Ty>> {
    method
        .generic_params
        .iter()
        .map(|param| infer_one(method, param, arg_types))
        .collect()
}

fn infer_one(method: &MethodDescriptor, param: &GenericParam, arg_types: &[Ty]) -> Option<Ty> {
    let exact = method
        .params
        .iter()
        .position(|p| matches!(&p.ty, Ty::Param(q) if q == param));
    if let Some(j) = exact {
        return arg_types.get(j).cloned();
    }

    method
        .params
        .iter()
        .zip(arg_types)
        .filter(|(formal, _)| formal.ty.mentions(param))
        .find_map(|(formal, actual)| match_param(&formal.ty, actual, param))
}

/// Find what `param` stands for when `formal` is laid over `actual`.
fn match_param(formal: &Ty, actual: &Ty, param: &GenericParam) -> Option<Ty> {
    match (formal, actual) {
        (Ty::Param(p), _) if p == param => Some(actual.clone()),
        (Ty::App(f_name, f_args), Ty::App(a_name, a_args))
            if f_name == a_name && f_args.len() == a_args.len() =>
        {
            f_args
                .iter()
                .zip(a_args)
                .find_map(|(f, a)| match_param(f, a, param))
        }
        _ => None,
    }
}
