//! Constructor/Operation Directory
//!
//! Static knowledge about FriCAS names: which constructors exist, their
//! abbreviations and kinds, and which names are operations. Used to pick
//! the right query command and to give info views a stable key.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Bound;

/// What a name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructorKind {
    Package,
    Domain,
    Category,
    Operation,
    Unknown,
}

impl ConstructorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstructorKind::Package => "package",
            ConstructorKind::Domain => "domain",
            ConstructorKind::Category => "category",
            ConstructorKind::Operation => "operation",
            ConstructorKind::Unknown => "constructor",
        }
    }

    pub fn is_constructor(self) -> bool {
        matches!(
            self,
            ConstructorKind::Package | ConstructorKind::Domain | ConstructorKind::Category
        )
    }
}

impl fmt::Display for ConstructorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a constructor name was spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NameForm {
    FullName,
    Abbreviation,
    Unknown,
}

/// A known constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constructor {
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub kind: ConstructorKind,
}

/// Result of looking a name up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: ConstructorKind,
    pub form: NameForm,
    /// Full constructor name, or the input itself if it isn't one
    pub canonical: String,
}

macro_rules! constructors {
    ($($kind:ident $name:literal $abbrev:literal;)*) => {
        &[$(Constructor {
            name: $name,
            abbreviation: $abbrev,
            kind: ConstructorKind::$kind,
        }),*]
    };
}

static CONSTRUCTORS: &[Constructor] = constructors! {
    Domain "Integer" "INT";
    Domain "NonNegativeInteger" "NNI";
    Domain "PositiveInteger" "PI";
    Domain "SingleInteger" "SINT";
    Domain "Float" "FLOAT";
    Domain "DoubleFloat" "DFLOAT";
    Domain "Fraction" "FRAC";
    Domain "Complex" "COMPLEX";
    Domain "Polynomial" "POLY";
    Domain "UnivariatePolynomial" "UP";
    Domain "SparseUnivariatePolynomial" "SUP";
    Domain "MultivariatePolynomial" "MPOLY";
    Domain "DistributedMultivariatePolynomial" "DMP";
    Domain "Expression" "EXPR";
    Domain "Symbol" "SYMBOL";
    Domain "String" "STRING";
    Domain "Character" "CHAR";
    Domain "Boolean" "BOOLEAN";
    Domain "List" "LIST";
    Domain "Vector" "VECTOR";
    Domain "Matrix" "MATRIX";
    Domain "SquareMatrix" "SQMATRIX";
    Domain "Set" "SET";
    Domain "Table" "TABLE";
    Domain "Stream" "STREAM";
    Domain "Record" "RECORD";
    Domain "Union" "UNION";
    Domain "Mapping" "MAPPING";
    Domain "Factored" "FR";
    Domain "PrimeField" "PF";
    Domain "IntegerMod" "ZMOD";
    Domain "AlgebraicNumber" "AN";
    Domain "OutputForm" "OUTFORM";
    Domain "UnivariatePuiseuxSeries" "UPXS";
    Domain "UnivariateTaylorSeries" "UTS";
    Domain "Permutation" "PERM";
    Domain "Quaternion" "QUAT";
    Domain "Void" "VOID";
    Domain "Any" "ANY";
    Category "Ring" "RING";
    Category "Field" "FIELD";
    Category "CommutativeRing" "COMRING";
    Category "IntegralDomain" "INTDOM";
    Category "EuclideanDomain" "EUCDOM";
    Category "PrincipalIdealDomain" "PID";
    Category "GcdDomain" "GCDDOM";
    Category "UniqueFactorizationDomain" "UFD";
    Category "Group" "GROUP";
    Category "AbelianGroup" "ABELGRP";
    Category "Monoid" "MONOID";
    Category "SetCategory" "SETCAT";
    Category "BasicType" "BASTYPE";
    Category "OrderedSet" "ORDSET";
    Category "Module" "MODULE";
    Category "Algebra" "ALGEBRA";
    Category "VectorSpace" "VSPACE";
    Category "PolynomialCategory" "POLYCAT";
    Category "FunctionSpace" "FS";
    Category "IntegerNumberSystem" "INS";
    Category "FloatingPointSystem" "FPS";
    Category "Aggregate" "AGG";
    Category "ListAggregate" "LSAGG";
    Category "MatrixCategory" "MATCAT";
    Category "TranscendentalFunctionCategory" "TRANFUN";
    Category "PolynomialFactorizationExplicit" "PFECAT";
    Package "IntegerPrimesPackage" "PRIMES";
    Package "IntegerFactorizationPackage" "INTFACT";
    Package "IntegerNumberTheoryFunctions" "INTHEORY";
    Package "FunctionSpaceIntegration" "FSINT";
    Package "ElementaryFunction" "EF";
    Package "MatrixLinearAlgebraFunctions" "MATLIN";
    Package "OutputPackage" "OUT";
    Package "DisplayPackage" "DISPLAY";
    Package "ListFunctions2" "LIST2";
    Package "GroebnerPackage" "GB";
    Package "TransSolvePackage" "SOLVETRA";
    Package "RadicalSolvePackage" "SOLVERAD";
    Package "ElementaryFunctionODESolver" "ODEEF";
    Package "PowerSeriesLimitPackage" "LIMITPS";
    Package "NumericRealEigenPackage" "NREP";
};

static OPERATIONS: &[&str] = &[
    "abs", "coefficient", "coefficients", "concat", "cos", "D", "degree", "determinant",
    "differentiate", "digits", "eval", "exp", "expand", "factor", "factorList", "gcd",
    "groebner", "integrate", "inverse", "lcm", "leadingCoefficient", "limit", "log", "map",
    "max", "min", "nullSpace", "numeric", "primeFactor", "rank", "reduce", "roots", "select",
    "series", "simplify", "sin", "solve", "sort", "sqrt", "subst", "tan", "taylor", "transpose",
    "variables", "zeroOf",
];

struct Index {
    /// Name or abbreviation -> (constructor, spelling)
    names: BTreeMap<&'static str, (&'static Constructor, NameForm)>,
    operations: HashSet<&'static str>,
}

static INDEX: Lazy<Index> = Lazy::new(|| {
    let mut names = BTreeMap::new();
    for constructor in CONSTRUCTORS {
        names.insert(constructor.name, (constructor, NameForm::FullName));
        names
            .entry(constructor.abbreviation)
            .or_insert((constructor, NameForm::Abbreviation));
    }
    Index {
        names,
        operations: OPERATIONS.iter().copied().collect(),
    }
});

/// Look up a name
///
/// Constructors win over operations when a name is both.
pub fn classify(name: &str) -> Classification {
    let name = name.trim();
    if let Some((constructor, form)) = INDEX.names.get(name) {
        return Classification {
            kind: constructor.kind,
            form: *form,
            canonical: constructor.name.to_string(),
        };
    }

    let kind = if INDEX.operations.contains(name) {
        ConstructorKind::Operation
    } else {
        ConstructorKind::Unknown
    };

    Classification {
        kind,
        form: NameForm::Unknown,
        canonical: name.to_string(),
    }
}

/// Full constructor name for `name`, or `name` itself when it isn't one
pub fn canonical_name(name: &str) -> String {
    classify(name).canonical
}

/// Constructor entry for a name or abbreviation
pub fn constructor(name: &str) -> Option<&'static Constructor> {
    INDEX.names.get(name.trim()).map(|(constructor, _)| *constructor)
}

pub fn is_operation(name: &str) -> bool {
    INDEX.operations.contains(name.trim())
}

/// Command that shows documentation for `name`
pub fn query_command(name: &str) -> String {
    let classification = classify(name);
    match classification.kind {
        ConstructorKind::Operation => format!(")display operation {}", classification.canonical),
        _ => format!(")show {}", classification.canonical),
    }
}

/// Known constructor names, abbreviations and operations starting with `prefix`
pub fn complete(prefix: &str) -> Vec<&'static str> {
    let mut matches: Vec<&'static str> = INDEX
        .names
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(|(name, _)| name.starts_with(prefix))
        .map(|(name, _)| *name)
        .chain(
            OPERATIONS
                .iter()
                .copied()
                .filter(|op| op.starts_with(prefix)),
        )
        .collect();
    matches.sort_unstable();
    matches.dedup();
    matches
}
