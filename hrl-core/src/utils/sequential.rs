use candle_core::{Result, Tensor};
use candle_nn::{Activation, Linear, Module, VarBuilder, linear};

/// A stack of linear layers with ReLU activations in between, the last layer is left linear.
/// Layer `i` stores its parameters under `{prefix}{i}.weight` and `{prefix}{i}.bias`.
#[derive(Debug, Clone, Default)]
pub struct Sequential {
    layers: Vec<Linear>,
}

impl Sequential {
    pub fn add(mut self, layer: Linear) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Module for Sequential {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        let last = self.layers.len().saturating_sub(1);
        for (idx, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if idx != last {
                xs = Activation::Relu.forward(&xs)?;
            }
        }
        Ok(xs)
    }
}

pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Sequential> {
    let mut last_dim = input_dim;
    let mut nn = Sequential::default();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        nn = nn.add(linear(last_dim, *layer_size, vb.pp(layer_pp))?);
        last_dim = *layer_size;
    }
    Ok(nn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn layers_are_registered_under_prefix() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let nn = build_sequential(4, &[8, 2], &vb, "value")?;
        assert_eq!(nn.len(), 2);
        let data = varmap.data().lock().map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        let mut names: Vec<_> = data.keys().cloned().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["value0.bias", "value0.weight", "value1.bias", "value1.weight"]
        );
        Ok(())
    }

    #[test]
    fn forward_maps_batch_to_output_width() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let nn = build_sequential(3, &[5, 1], &vb, "value")?;
        let xs = Tensor::zeros((7, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(nn.forward(&xs)?.dims(), &[7, 1]);
        Ok(())
    }
}
