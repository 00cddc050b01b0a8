use truvis_frame_graph::graph::render_graph::RenderGraph;

/// 可以注册到 [`RenderGraph`] 的 pass
pub trait RgPassBase {
    /// 把 setup / execute 闭包注册到 graph
    ///
    /// 同一类型的 pass 在一个 graph 中只能注册一次，重复注册返回 false
    fn add_to_graph(&self, graph: &mut RenderGraph) -> bool;
}
