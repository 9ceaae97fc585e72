pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};
pub use tch::{kind::FLOAT_CPU, vision, Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;
