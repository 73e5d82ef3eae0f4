use candle_core::Result;
use candle_core::Tensor;
use candle_core::backprop::GradStore;
use candle_nn::VarMap;

/// Back-propagates `loss` and rescales the gradients of every variable in `varmap` so that their
/// global L2 norm is at most `max_norm`.
pub fn clip_grad(loss: &Tensor, varmap: &VarMap, max_norm: f32) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    let all_vars = varmap.all_vars();
    let mut total_norm_squared = 0.0f32;
    for var in all_vars.iter() {
        if let Some(grad) = grad_store.get(var.as_tensor()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = (max_norm / (total_norm + 1e-6)) as f64;
        for var in all_vars.iter() {
            let clipped = match grad_store.get(var.as_tensor()) {
                Some(grad) => (grad * clip_coef)?,
                None => continue,
            };
            grad_store.insert(var.as_tensor(), clipped);
        }
    }
    Ok(grad_store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{Init, VarBuilder};

    fn grad_norm(grads: &GradStore, varmap: &VarMap) -> Result<f32> {
        let mut total = 0f32;
        for var in varmap.all_vars() {
            if let Some(grad) = grads.get(var.as_tensor()) {
                total += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            }
        }
        Ok(total.sqrt())
    }

    #[test]
    fn large_gradients_are_scaled_down() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let w = vb.get_with_hints(4, "w", Init::Const(1.))?;
        let loss = (w.sum_all()? * 100.)?;
        let grads = clip_grad(&loss, &varmap, 0.5)?;
        assert!((grad_norm(&grads, &varmap)? - 0.5).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn small_gradients_are_untouched() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let w = vb.get_with_hints(4, "w", Init::Const(1.))?;
        let loss = (w.sum_all()? * 0.01)?;
        let grads = clip_grad(&loss, &varmap, 0.5)?;
        assert!((grad_norm(&grads, &varmap)? - 0.02).abs() < 1e-5);
        Ok(())
    }
}
