use super::calendar::{Date, Duration};
use serde::{Deserialize, Serialize};

/// Rectilinear horizontal domain.
///
/// Global extents describe the whole grid, the local window is the part owned
/// by this process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub ni_glo: Option<usize>,
    pub nj_glo: Option<usize>,
    pub ni: Option<usize>,
    pub nj: Option<usize>,
    pub ibegin: Option<usize>,
    pub jbegin: Option<usize>,
    #[serde(default)]
    pub lonvalue: Vec<f64>,
    #[serde(default)]
    pub latvalue: Vec<f64>,
}

impl Domain {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Local window `(ibegin, jbegin, ni, nj)`; defaults to the whole grid.
    pub fn local_window(&self) -> Option<(usize, usize, usize, usize)> {
        let ni = self.ni.or(self.ni_glo)?;
        let nj = self.nj.or(self.nj_glo)?;
        Some((self.ibegin.unwrap_or(0), self.jbegin.unwrap_or(0), ni, nj))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub id: String,
    pub n_glo: Option<usize>,
    #[serde(default)]
    pub value: Vec<f64>,
}

impl Axis {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

fn default_freq_op() -> Duration {
    Duration::timesteps(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    /// Operation frequency; one timestep unless configured.
    #[serde(default = "default_freq_op")]
    pub freq_op: Duration,
    pub domain_ref: Option<String>,
    pub axis_ref: Option<String>,
}

impl Field {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            freq_op: default_freq_op(),
            domain_ref: None,
            axis_ref: None,
        }
    }
}

/// A 3D block of doubles, stored row-major as `[k][j][i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldBlock {
    pub shape: [usize; 3],
    pub values: Vec<f64>,
}

impl FieldBlock {
    pub fn from_fn(shape: [usize; 3], f: impl Fn(usize, usize, usize) -> f64) -> Self {
        let [ni, nj, nk] = shape;
        let mut values = Vec::with_capacity(ni * nj * nk);
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    values.push(f(i, j, k));
                }
            }
        }
        Self { shape, values }
    }

    pub fn is_consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.values.len()
    }
}

/// One field write, as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    pub context_id: String,
    pub field_id: String,
    pub tile_id: usize,
    pub step: u64,
    pub date: Date,
    pub block: FieldBlock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_window_defaults_to_global() {
        let mut domain = Domain::new("domain");
        assert_eq!(domain.local_window(), None);
        domain.ni_glo = Some(10);
        domain.nj_glo = Some(4);
        assert_eq!(domain.local_window(), Some((0, 0, 10, 4)));
        domain.ni = Some(5);
        domain.ibegin = Some(5);
        assert_eq!(domain.local_window(), Some((5, 0, 5, 4)));
    }

    #[test]
    fn test_field_block_layout() {
        let block = FieldBlock::from_fn([3, 2, 1], |i, j, _| (i + 10 * j) as f64);
        assert!(block.is_consistent());
        assert_eq!(block.values, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_field_defaults_to_one_timestep() {
        let field: Field = toml::from_str(r#"id = "sst""#).unwrap();
        assert_eq!(field.freq_op.to_string(), "1ts");
    }
}
