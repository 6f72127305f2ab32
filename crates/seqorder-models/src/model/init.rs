use candle_core::{bail, Result, Tensor};
use candle_nn::VarMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Distribution a parameter was created with.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamInit {
    Normal { std: f64 },
    Uniform { bound: f64 },
    Zeros,
}

/// Redraw every parameter of `varmap` from a generator seeded with `seed`.
///
/// Parameters are visited in name order and keep the distributions candle-nn gives them:
/// Kaiming normal for linear weights, `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` for linear
/// biases, Kaiming uniform for LSTM weights and zeros for LSTM biases.
pub fn seed_parameters(varmap: &VarMap, seed: u64) -> Result<()> {
    let vars = varmap
        .data()
        .lock()
        .map_err(|_| candle_core::Error::Msg("parameter map lock poisoned".to_string()))?;
    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();

    let mut rng = StdRng::seed_from_u64(seed);
    for name in names {
        let var = &vars[name];
        let fan_in = fan_in(name, var.dims(), |w| vars.get(w).map(|v| v.dims().to_vec()))?;
        let init = param_init(name, fan_in)?;
        let values: Vec<f32> = (0..var.elem_count())
            .map(|_| match init {
                ParamInit::Normal { std } => {
                    let z: f64 = rng.sample(StandardNormal);
                    (z * std) as f32
                }
                ParamInit::Uniform { bound } => rng.gen_range(-bound..bound) as f32,
                ParamInit::Zeros => 0.0,
            })
            .collect();
        let value = Tensor::from_vec(values, var.dims(), var.device())?.to_dtype(var.dtype())?;
        var.set(&value)?;
    }
    log::debug!("{} parameters initialized with seed {seed}", vars.len());
    Ok(())
}

fn leaf(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Input width of the layer owning `name`. Biases borrow it from their sibling weight.
fn fan_in<F>(name: &str, dims: &[usize], weight_dims: F) -> Result<usize>
where
    F: Fn(&str) -> Option<Vec<usize>>,
{
    if dims.len() >= 2 {
        return Ok(dims[1..].iter().product());
    }
    if leaf(name) == "bias" {
        let Some(prefix) = name.strip_suffix("bias") else {
            bail!("unexpected parameter name {name}");
        };
        return match weight_dims(&format!("{prefix}weight")) {
            Some(w) if w.len() >= 2 => Ok(w[1..].iter().product()),
            _ => bail!("no weight found for bias {name}"),
        };
    }
    Ok(1)
}

fn param_init(name: &str, fan_in: usize) -> Result<ParamInit> {
    let fan = fan_in.max(1) as f64;
    let leaf = leaf(name);
    // gain of a ReLU-like non-linearity
    let std = 2f64.sqrt() / fan.sqrt();
    let init = if leaf.starts_with("weight_ih") || leaf.starts_with("weight_hh") {
        ParamInit::Uniform {
            bound: 3f64.sqrt() * std,
        }
    } else if leaf.starts_with("bias_ih") || leaf.starts_with("bias_hh") {
        ParamInit::Zeros
    } else if leaf == "weight" {
        ParamInit::Normal { std }
    } else if leaf == "bias" {
        ParamInit::Uniform {
            bound: 1.0 / fan.sqrt(),
        }
    } else {
        bail!("no initialization known for parameter {name}")
    };
    Ok(init)
}
