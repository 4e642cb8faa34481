//! Errors raised while setting up the workers or reading maps and configuration
//!

use thiserror::Error;

/// Failures of fallible setup and I/O. Pathfinding itself never fails, an
/// unreachable or invalid target simply produces an undetermined
/// [crate::prelude::FlowField]
#[derive(Debug, Error)]
pub enum EngineError {
	/// A background worker thread could not be spawned
	#[error("failed to spawn worker thread `{name}`: {source}")]
	WorkerSpawn {
		/// Name given to the thread
		name: String,
		/// Underlying OS error
		#[source]
		source: std::io::Error,
	},
	/// Reading a file from disk failed
	#[error("i/o failure: {0}")]
	Io(#[from] std::io::Error),
	/// A `ron` document could not be parsed
	#[cfg(feature = "ron")]
	#[error("failed parsing ron: {0}")]
	Ron(#[from] ron::error::SpannedError),
	/// An ASCII obstacle map contains no rows
	#[error("obstacle map contains no rows")]
	EmptyMap,
	/// An ASCII obstacle map row is a different length to the first row
	#[error("obstacle map row {row} has {found} cells, expected {expected}")]
	RaggedMap {
		/// Zero based index of the offending row
		row: usize,
		/// Length of the first row
		expected: usize,
		/// Length of the offending row
		found: usize,
	},
	/// An ASCII obstacle map contains a symbol other than `#` or `.`
	#[error("unknown obstacle map symbol {symbol:?} at column {column}, row {row}")]
	UnknownSymbol {
		/// The offending character
		symbol: char,
		/// Zero based column of the symbol
		column: usize,
		/// Zero based row of the symbol
		row: usize,
	},
	/// Logical cells of a deserialised obstacle map don't match its dimensions
	#[error("obstacle map of {width}x{height} cannot hold {found} cells")]
	CellCountMismatch {
		/// Declared width
		width: u32,
		/// Declared height
		height: u32,
		/// Number of cells supplied
		found: usize,
	},
}
