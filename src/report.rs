//! Serializable summary of the types inferred for a machine.
//!
//! Consumers that only need the declared types (translators, code
//! generators, editors) can take a [`TypeReport`] instead of walking the AST.

use crate::ast::{DeclId, Declarations, Machine};
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedName {
    pub name: String,
    /// `None` when the declaration has not been typed
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSignature {
    pub name: String,
    pub params: Vec<TypedName>,
    pub outputs: Vec<TypedName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeReport {
    pub machine: String,
    pub sets: Vec<TypedName>,
    pub constants: Vec<TypedName>,
    pub variables: Vec<TypedName>,
    pub operations: Vec<OperationSignature>,
}

fn typed_names(decls: &Declarations, ids: &[DeclId]) -> Vec<TypedName> {
    ids.iter()
        .filter_map(|&id| decls.get(id))
        .map(|decl| TypedName {
            name: decl.name.clone(),
            ty: decl.ty.clone(),
        })
        .collect()
}

impl TypeReport {
    pub fn from_machine(machine: &Machine) -> Self {
        let decls = &machine.decls;
        let set_ids: Vec<DeclId> = machine
            .enumerated_sets
            .iter()
            .map(|set| set.set)
            .chain(machine.deferred_sets.iter().copied())
            .collect();
        let mut variables = typed_names(decls, &machine.variables);
        variables.extend(typed_names(decls, &machine.included_renamed_variables));

        Self {
            machine: machine.name.clone(),
            sets: typed_names(decls, &set_ids),
            constants: typed_names(decls, &machine.constants),
            variables,
            operations: machine
                .operations
                .iter()
                .map(|op| OperationSignature {
                    name: op.name.clone(),
                    params: typed_names(decls, &op.params),
                    outputs: typed_names(decls, &op.outputs),
                })
                .collect(),
        }
    }

    /// Whether every listed declaration has a type.
    pub fn is_complete(&self) -> bool {
        let names = self
            .sets
            .iter()
            .chain(&self.constants)
            .chain(&self.variables)
            .chain(
                self.operations
                    .iter()
                    .flat_map(|op| op.params.iter().chain(&op.outputs)),
            );
        names.into_iter().all(|typed| typed.ty.is_some())
    }
}
