//! Graph scan: a parameter-level view of a network

use std::fmt::Write;

use tch::nn::VarStore;

/// One named variable of a network
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub shape: Vec<i64>,
    pub numel: usize,
    pub trainable: bool,
}

/// List every variable in `vs`, sorted by name
pub fn scan_graph(vs: &VarStore) -> Vec<ParamInfo> {
    let mut params: Vec<ParamInfo> = vs
        .variables()
        .into_iter()
        .map(|(name, var)| ParamInfo {
            name,
            shape: var.size(),
            numel: var.numel(),
            trainable: var.requires_grad(),
        })
        .collect();
    params.sort_by(|a, b| a.name.cmp(&b.name));
    params
}

/// Human-readable summary of a network's variables and parameter budget
pub fn model_summary(title: &str, vs: &VarStore) -> String {
    let params = scan_graph(vs);

    let total: usize = params.iter().map(|p| p.numel).sum();
    let trainable: usize = params.iter().filter(|p| p.trainable).map(|p| p.numel).sum();
    let memory_bytes = total * std::mem::size_of::<f32>();

    let mut out = String::new();
    let _ = writeln!(out, "===== {title} =====");
    for p in &params {
        let marker = if p.trainable { "" } else { " (frozen)" };
        let _ = writeln!(out, "{:<24} {:<20} {:>10}{marker}", p.name, format!("{:?}", p.shape), p.numel);
    }
    let _ = writeln!(out, "Total parameters:     {total}");
    let _ = writeln!(out, "Trainable parameters: {trainable}");
    let _ = write!(out, "Memory estimate:      {memory_bytes} bytes");

    if memory_bytes >= 1024 * 1024 {
        let mb = memory_bytes as f64 / (1024.0 * 1024.0);
        let _ = write!(out, " ({mb:.2} MB)");
    } else if memory_bytes >= 1024 {
        let kb = memory_bytes as f64 / 1024.0;
        let _ = write!(out, " ({kb:.2} KB)");
    }

    out
}
