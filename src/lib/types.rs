use smallvec::SmallVec;

pub type Str = String;
pub type Args = SmallVec<[Str; 4]>;

/// Construct a new `Args` from the given arguments, converting each with `Into`.
///
/// ```
/// let args = pipesh::args!["-n", "hello"];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! args [
    ( $($x:expr),* $(,)? ) => {{
        #[allow(unused_mut)]
        let mut args = $crate::types::Args::new();
        $(
            args.push($x.into());
        )*
        args
    }}
];
