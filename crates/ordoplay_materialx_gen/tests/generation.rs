// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end generation from documents.

use ordoplay_materialx_core::document::{GraphOutput, Implementation, InputBinding, NodeDef, NodeGraph, NodeInstance, PortDef};
use ordoplay_materialx_core::{stdlib, CoreError, Document, ErrorKind, FileSearchPath, Value};
use ordoplay_materialx_gen::{
    generate_from_node, generate_from_node_graph, FragmentGenerator, GenContext, GenError, GenOptions,
    GlslShaderGenerator, MdlShaderGenerator, OslShaderGenerator, ShaderGraph,
};

fn output(name: &str, type_name: &str, nodename: &str) -> GraphOutput {
    GraphOutput {
        name: name.to_string(),
        type_name: type_name.to_string(),
        nodename: nodename.to_string(),
        output: None,
        channels: None,
    }
}

fn multiply_graph() -> NodeGraph {
    let mut graph = NodeGraph::new("NG_mul");
    graph.nodes.push(
        NodeInstance::new("mul", "multiply", "float")
            .with_input(InputBinding::value("in1", "float", "2.0"))
            .with_input(InputBinding::value("in2", "float", "3.0")),
    );
    graph.outputs.push(output("out", "float", "mul"));
    graph
}

fn scale_graph() -> NodeGraph {
    let mut graph = NodeGraph::new("NG_scale");
    graph.nodes.push(
        NodeInstance::new("sc", "scale", "color3")
            .with_input(InputBinding::value("in", "color3", "0.5, 0.25, 1.0"))
            .with_input(InputBinding::value("amount", "float", "2.0")),
    );
    graph.outputs.push(output("out", "color3", "sc"));
    graph
}

fn library_with(graphs: Vec<NodeGraph>) -> Document {
    let mut doc = stdlib::standard_library();
    doc.nodegraphs.extend(graphs);
    doc
}

fn options(flatten: bool) -> GenContext {
    GenContext::new(GenOptions {
        flatten_subgraphs: flatten,
        ..GenOptions::default()
    })
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("'{needle}' not found in:\n{haystack}"))
}

#[test]
fn test_inline_multiply_is_scheduled_before_output() {
    let doc = library_with(vec![multiply_graph()]);
    let generator = OslShaderGenerator::new().unwrap();
    let mut ctx = GenContext::default();

    let shader = generate_from_node_graph(&generator, "NG_mul", doc.nodegraph("NG_mul").unwrap(), &doc, &mut ctx).unwrap();
    let code = shader.source_code();

    let call = position(code, "mul_out = 2.0 * 3.0;");
    let assignment = position(code, "= mul_out;");
    assert!(call < assignment);
    assert!(code.contains("shader NG_mul"));
}

#[test]
fn test_exact_target_wins_over_wildcard() {
    let mut doc = library_with(vec![multiply_graph()]);
    doc.implementations.push(Implementation {
        name: "IM_multiply_float_osl_arnold".to_string(),
        nodedef: "ND_multiply_float".to_string(),
        file: Some("mx_multiply_float_arnold.inline".to_string()),
        function: None,
        language: "osl".to_string(),
        target: "arnold".to_string(),
        source: Some("{{in1}} * {{in2}} * 0.5".to_string()),
    });
    let generator = OslShaderGenerator::new().unwrap();
    let graph = doc.nodegraph("NG_mul").unwrap();

    let mut ctx = GenContext::new(GenOptions {
        target: Some("arnold".to_string()),
        ..GenOptions::default()
    });
    let exact = generate_from_node_graph(&generator, "NG_mul", graph, &doc, &mut ctx).unwrap();
    assert!(exact.source_code().contains("2.0 * 3.0 * 0.5"));

    let mut ctx = GenContext::new(GenOptions {
        target: Some("other".to_string()),
        ..GenOptions::default()
    });
    let fallback = generate_from_node_graph(&generator, "NG_mul", graph, &doc, &mut ctx).unwrap();
    assert!(fallback.source_code().contains("mul_out = 2.0 * 3.0;"));
}

#[test]
fn test_missing_implementation_is_a_lookup_error() {
    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_warp_float", "warp")
            .with_input(PortDef::new("in", "float").with_value("0.0"))
            .with_output(PortDef::new("out", "float")),
    );
    doc.implementations.push(Implementation {
        name: "IM_warp_float_osl".to_string(),
        nodedef: "ND_warp_float".to_string(),
        file: Some("mx_warp_float.inline".to_string()),
        function: None,
        language: "osl".to_string(),
        target: String::new(),
        source: Some("sin({{in}})".to_string()),
    });
    let mut graph = NodeGraph::new("NG_warp");
    graph.nodes.push(NodeInstance::new("w", "warp", "float"));
    graph.outputs.push(output("out", "float", "w"));
    doc.nodegraphs.push(graph);

    let osl = OslShaderGenerator::new().unwrap();
    let shader =
        generate_from_node_graph(&osl, "NG_warp", doc.nodegraph("NG_warp").unwrap(), &doc, &mut GenContext::default())
            .unwrap();
    assert!(shader.source_code().contains("sin(0.0)"));

    let mdl = MdlShaderGenerator::new().unwrap();
    let err = generate_from_node_graph(&mdl, "NG_warp", doc.nodegraph("NG_warp").unwrap(), &doc, &mut GenContext::default())
        .unwrap_err();
    assert!(matches!(err, GenError::MissingImplementation { .. }));
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_empty_array_parameter_is_rejected() {
    let mut graph = NodeGraph::new("NG_weights");
    graph.inputs.push(PortDef::new("weights", "floatarray").with_value(""));
    graph.nodes.push(
        NodeInstance::new("c", "constant", "float").with_input(InputBinding::value("value", "float", "1.0")),
    );
    graph.outputs.push(output("out", "float", "c"));
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let err = generate_from_node_graph(
        &generator,
        "NG_weights",
        doc.nodegraph("NG_weights").unwrap(),
        &doc,
        &mut GenContext::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::Core(CoreError::EmptyArray(_))));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_empty_glsl_uniform_array_is_rejected() {
    let mut graph = NodeGraph::new("NG_weights");
    graph.inputs.push(PortDef::new("weights", "floatarray").with_value(""));
    graph.nodes.push(
        NodeInstance::new("c", "constant", "float").with_input(InputBinding::value("value", "float", "1.0")),
    );
    graph.outputs.push(output("out", "float", "c"));
    let doc = library_with(vec![graph]);

    let generator = GlslShaderGenerator::new().unwrap();
    let err = generate_from_node_graph(
        &generator,
        "NG_weights",
        doc.nodegraph("NG_weights").unwrap(),
        &doc,
        &mut GenContext::default(),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::Core(CoreError::EmptyArray(_))));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_glsl_uniform_array_declares_its_length() {
    let mut graph = NodeGraph::new("NG_weights");
    graph.inputs.push(PortDef::new("weights", "floatarray").with_value("0.25, 0.5, 0.25"));
    graph.nodes.push(
        NodeInstance::new("c", "constant", "float").with_input(InputBinding::value("value", "float", "1.0")),
    );
    graph.outputs.push(output("out", "float", "c"));
    let doc = library_with(vec![graph]);

    let generator = GlslShaderGenerator::new().unwrap();
    let shader = generate_from_node_graph(
        &generator,
        "NG_weights",
        doc.nodegraph("NG_weights").unwrap(),
        &doc,
        &mut GenContext::default(),
    )
    .unwrap();
    assert!(shader.source_code().contains("uniform float weights[3];"));
}

#[test]
fn test_cycle_between_nodes_is_reported() {
    let mut graph = NodeGraph::new("NG_cycle");
    graph.nodes.push(NodeInstance::new("A", "add", "float").with_input(InputBinding::node("in1", "float", "B")));
    graph.nodes.push(NodeInstance::new("B", "add", "float").with_input(InputBinding::node("in1", "float", "A")));
    graph.outputs.push(output("out", "float", "A"));
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let err = ShaderGraph::from_node_graph(doc.nodegraph("NG_cycle").unwrap(), &doc, &generator, &mut GenContext::default())
        .unwrap_err();
    match &err {
        GenError::CycleDetected { chain, .. } => {
            assert!(chain.contains(&"A".to_string()));
            assert!(chain.contains(&"B".to_string()));
            assert_eq!(chain.first(), chain.last());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::CycleDetected);
}

#[test]
fn test_self_instantiating_compound_is_rejected() {
    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_loop_float", "loop")
            .with_input(PortDef::new("in", "float").with_value("0.0"))
            .with_output(PortDef::new("out", "float")),
    );
    let mut compound = NodeGraph::new("NG_loop_float");
    compound.nodedef = Some("ND_loop_float".to_string());
    compound.nodes.push(NodeInstance::new("inner", "loop", "float"));
    compound.outputs.push(output("out", "float", "inner"));
    doc.nodegraphs.push(compound);

    let mut graph = NodeGraph::new("NG_uses_loop");
    graph.nodes.push(NodeInstance::new("l", "loop", "float"));
    graph.outputs.push(output("out", "float", "l"));
    doc.nodegraphs.push(graph);

    let generator = OslShaderGenerator::new().unwrap();
    let err = ShaderGraph::from_node_graph(
        doc.nodegraph("NG_uses_loop").unwrap(),
        &doc,
        &generator,
        &mut GenContext::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicCompound);
}

#[test]
fn test_flattening_inlines_compounds_once() {
    let doc = library_with(vec![scale_graph()]);
    let generator = OslShaderGenerator::new().unwrap();
    let mut graph =
        ShaderGraph::from_node_graph(doc.nodegraph("NG_scale").unwrap(), &doc, &generator, &mut options(false)).unwrap();
    assert!(graph.nodes().any(|n| n.implementation.is_compound()));

    graph.flatten_subgraphs().unwrap();
    let first: Vec<String> = graph.nodes().map(|n| n.name.clone()).collect();
    assert!(graph.nodes().all(|n| !n.implementation.is_compound()));
    assert_eq!(first, vec!["sc_scaled".to_string()]);

    graph.flatten_subgraphs().unwrap();
    let second: Vec<String> = graph.nodes().map(|n| n.name.clone()).collect();
    assert_eq!(first, second);
}

fn channel_scale_library() -> Document {
    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_channel_scale", "channel_scale")
            .with_input(PortDef::new("in", "color3").with_value("0.5, 0.25, 1.0"))
            .with_input(PortDef::new("amount", "float").with_value("2.0"))
            .with_output(PortDef::new("out", "float")),
    );
    let mut compound = NodeGraph::new("NG_channel_scale");
    compound.nodedef = Some("ND_channel_scale".to_string());
    compound.nodes.push(
        NodeInstance::new("m", "multiply", "float")
            .with_input(InputBinding::interface("in1", "float", "in").with_channels("g"))
            .with_input(InputBinding::interface("in2", "float", "amount")),
    );
    compound.outputs.push(output("out", "float", "m"));
    doc.nodegraphs.push(compound);
    doc
}

#[test]
fn test_flattening_swizzles_literal_through_interface_channels() {
    let mut doc = channel_scale_library();
    let mut graph = NodeGraph::new("NG_green");
    graph.nodes.push(NodeInstance::new("cs", "channel_scale", "float"));
    graph.outputs.push(output("out", "float", "cs"));
    doc.nodegraphs.push(graph);
    let generator = OslShaderGenerator::new().unwrap();

    let graph =
        ShaderGraph::from_node_graph(doc.nodegraph("NG_green").unwrap(), &doc, &generator, &mut options(true)).unwrap();
    let inner = graph.node_by_name("cs_m").unwrap();
    let in1 = inner.input("in1").unwrap();
    assert_eq!(in1.value, Some(Value::Float(0.25)));
    assert_eq!(in1.channels, None);

    let shader = generate_from_node_graph(&generator, "NG_green", doc.nodegraph("NG_green").unwrap(), &doc, &mut options(true))
        .unwrap();
    assert!(shader.source_code().contains("cs_m_out = 0.25 * 2.0;"));
}

#[test]
fn test_flattening_composes_outer_and_inner_channels() {
    let mut doc = channel_scale_library();
    let mut graph = NodeGraph::new("NG_swizzled");
    graph.nodes.push(
        NodeInstance::new("k", "constant", "vector3")
            .with_input(InputBinding::value("value", "vector3", "0.1, 0.2, 0.3")),
    );
    graph.nodes.push(
        NodeInstance::new("cs", "channel_scale", "float")
            .with_input(InputBinding::node("in", "color3", "k").with_channels("zyx")),
    );
    graph.outputs.push(output("out", "float", "cs"));
    doc.nodegraphs.push(graph);
    let generator = OslShaderGenerator::new().unwrap();

    let graph =
        ShaderGraph::from_node_graph(doc.nodegraph("NG_swizzled").unwrap(), &doc, &generator, &mut options(true)).unwrap();
    let k = graph.node_by_name("k").unwrap().id;
    let in1 = graph.node_by_name("cs_m").unwrap().input("in1").unwrap();
    assert_eq!(in1.channels.as_deref(), Some("y"));
    assert_eq!(in1.connection.and_then(|c| c.node_id()), Some(k));
}

#[test]
fn test_compound_emitted_as_function_without_flattening() {
    let doc = library_with(vec![scale_graph()]);
    let generator = OslShaderGenerator::new().unwrap();
    let graph = doc.nodegraph("NG_scale").unwrap();

    let nested = generate_from_node_graph(&generator, "NG_scale", graph, &doc, &mut options(false)).unwrap();
    let code = nested.source_code();
    let definition = position(code, "void NG_scale_color3(");
    let call = position(code, "NG_scale_color3(color(0.5, 0.25, 1.0), 2.0, sc_out);");
    assert!(definition < call);

    let flat = generate_from_node_graph(&generator, "NG_scale", graph, &doc, &mut options(true)).unwrap();
    assert!(!flat.source_code().contains("NG_scale_color3"));
    assert!(flat.source_code().contains("sc_scaled_out = color(0.5, 0.25, 1.0) * 2.0;"));
}

#[test]
fn test_conditional_branches_hold_their_own_nodes() {
    let mut graph = NodeGraph::new("NG_cond");
    graph.nodes.push(
        NodeInstance::new("a", "add", "float")
            .with_input(InputBinding::value("in1", "float", "1.0"))
            .with_input(InputBinding::value("in2", "float", "2.0")),
    );
    graph.nodes.push(
        NodeInstance::new("b", "multiply", "float")
            .with_input(InputBinding::value("in1", "float", "3.0"))
            .with_input(InputBinding::value("in2", "float", "4.0")),
    );
    graph.nodes.push(
        NodeInstance::new("c", "ifgreater", "float")
            .with_input(InputBinding::node("in1", "float", "a"))
            .with_input(InputBinding::node("in2", "float", "b")),
    );
    graph.outputs.push(output("out", "float", "c"));
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let shader =
        generate_from_node_graph(&generator, "NG_cond", doc.nodegraph("NG_cond").unwrap(), &doc, &mut GenContext::default())
            .unwrap();
    let code = shader.source_code();

    let declaration = position(code, "float c_out = 0.0;");
    let condition = position(code, "if (1.0 > 0.0)");
    let first = position(code, "a_out = 1.0 + 2.0;");
    let otherwise = position(code, "else");
    let second = position(code, "b_out = 3.0 * 4.0;");
    assert!(declaration < condition);
    assert!(condition < first && first < otherwise && otherwise < second);
}

#[test]
fn test_single_node_shader_exposes_unconnected_inputs() {
    let mut doc = stdlib::standard_library();
    doc.nodes.push(
        NodeInstance::new("mul", "multiply", "float").with_input(InputBinding::value("in1", "float", "2.0")),
    );
    let generator = OslShaderGenerator::new().unwrap();

    let shader = generate_from_node(&generator, "mul", doc.node("mul").unwrap(), &doc, &mut GenContext::default()).unwrap();
    let code = shader.source_code();
    assert!(code.contains("float in1 = 2.0"));
    assert!(code.contains("float in2 = 1.0"));
    assert!(code.contains("mul_out = in1 * in2;"));
}

#[test]
fn test_glsl_rejects_closures() {
    let mut doc = stdlib::standard_library();
    doc.nodes.push(NodeInstance::new("diffuse", "diffuse_bsdf", "BSDF"));
    let generator = GlslShaderGenerator::new().unwrap();

    let err = generate_from_node(&generator, "diffuse", doc.node("diffuse").unwrap(), &doc, &mut GenContext::default())
        .unwrap_err();
    assert!(matches!(err, GenError::Unsupported(_)));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_mdl_rejects_multiple_outputs() {
    let mut graph = multiply_graph();
    graph.outputs.push(output("copy", "float", "mul"));
    let doc = library_with(vec![graph]);
    let generator = MdlShaderGenerator::new().unwrap();

    let err =
        generate_from_node_graph(&generator, "NG_mul", doc.nodegraph("NG_mul").unwrap(), &doc, &mut GenContext::default())
            .unwrap_err();
    assert!(matches!(err, GenError::UnsupportedMultiOutput { .. }));
}

#[test]
fn test_glsl_rejects_multiple_outputs() {
    let mut graph = multiply_graph();
    graph.outputs.push(output("copy", "float", "mul"));
    let doc = library_with(vec![graph]);
    let generator = GlslShaderGenerator::new().unwrap();

    let err =
        generate_from_node_graph(&generator, "NG_mul", doc.nodegraph("NG_mul").unwrap(), &doc, &mut GenContext::default())
            .unwrap_err();
    assert!(matches!(err, GenError::UnsupportedMultiOutput { .. }));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_mdl_module_header() {
    let doc = library_with(vec![multiply_graph()]);
    let generator = MdlShaderGenerator::new().unwrap();

    let shader =
        generate_from_node_graph(&generator, "NG_mul", doc.nodegraph("NG_mul").unwrap(), &doc, &mut GenContext::default())
            .unwrap();
    let code = shader.source_code();
    assert!(code.starts_with("mdl 1.6;"));
    assert!(code.contains("2.0 * 3.0"));
}

#[test]
fn test_mdl_closure_compound_keeps_parameter_defaults() {
    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_tinted_diffuse", "tinted_diffuse")
            .with_input(PortDef::new("tint", "color3").with_value("0.5, 0.25, 1.0"))
            .with_input(PortDef::new("rough", "float").with_value("0.5").uniform())
            .with_output(PortDef::new("out", "BSDF")),
    );
    let mut compound = NodeGraph::new("NG_tinted_diffuse");
    compound.nodedef = Some("ND_tinted_diffuse".to_string());
    compound.nodes.push(
        NodeInstance::new("d", "diffuse_bsdf", "BSDF")
            .with_input(InputBinding::interface("color", "color3", "tint"))
            .with_input(InputBinding::interface("roughness", "float", "rough")),
    );
    compound.outputs.push(output("out", "BSDF", "d"));
    doc.nodegraphs.push(compound);

    let mut graph = NodeGraph::new("NG_shaded");
    graph.nodes.push(NodeInstance::new("t", "tinted_diffuse", "BSDF"));
    graph.nodes.push(NodeInstance::new("s", "surface", "surfaceshader").with_input(InputBinding::node("bsdf", "BSDF", "t")));
    graph.outputs.push(output("out", "surfaceshader", "s"));
    doc.nodegraphs.push(graph);

    let generator = MdlShaderGenerator::new().unwrap();
    let shader =
        generate_from_node_graph(&generator, "NG_shaded", doc.nodegraph("NG_shaded").unwrap(), &doc, &mut options(false))
            .unwrap();
    let code = shader.source_code();

    let definition = position(code, "bsdf NG_tinted_diffuse");
    assert!(code.contains("color tint = color(0.5, 0.25, 1.0)"));
    assert!(code.contains("uniform float rough = 0.5"));
    let body = position(code, "= let");
    let result = position(code, "in d_out;");
    let root = position(code, "export material NG_shaded");
    assert!(definition < body && body < result && result < root);
    assert!(code.contains("in s_out;"));
}

#[test]
fn test_conditional_with_too_many_inputs_is_rejected() {
    let mut doc = stdlib::standard_library();
    let mut nodedef = NodeDef::new("ND_switch_wide", "switch").with_input(PortDef::new("which", "float").with_value("0.0"));
    for i in 1..=32 {
        nodedef = nodedef.with_input(PortDef::new(format!("in{i}"), "float").with_value("0.0"));
    }
    doc.nodedefs.push(nodedef.with_output(PortDef::new("out", "float")));
    let mut wide = NodeInstance::new("w", "switch", "float");
    wide.nodedef = Some("ND_switch_wide".to_string());
    doc.nodes.push(wide);
    let generator = OslShaderGenerator::new().unwrap();

    let err = generate_from_node(&generator, "w", doc.node("w").unwrap(), &doc, &mut GenContext::default()).unwrap_err();
    assert!(matches!(err, GenError::Unsupported(_)));
}

#[test]
fn test_unterminated_inline_token_names_the_implementation() {
    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_broken_float", "broken")
            .with_input(PortDef::new("in1", "float").with_value("1.0"))
            .with_input(PortDef::new("in2", "float").with_value("2.0"))
            .with_output(PortDef::new("out", "float")),
    );
    doc.implementations.push(Implementation {
        name: "IM_broken_float_osl".to_string(),
        nodedef: "ND_broken_float".to_string(),
        file: Some("mx_broken_float.inline".to_string()),
        function: None,
        language: "osl".to_string(),
        target: String::new(),
        source: Some("{{in1}} * {{in2".to_string()),
    });
    doc.nodes.push(NodeInstance::new("b", "broken", "float"));
    let generator = OslShaderGenerator::new().unwrap();

    let err = generate_from_node(&generator, "b", doc.node("b").unwrap(), &doc, &mut GenContext::default()).unwrap_err();
    assert!(matches!(&err, GenError::UnterminatedInlineToken(name) if name == "IM_broken_float_osl"));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_source_files_resolved_through_search_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("mx_tint.osl"),
        "void mx_tint(color in, output color result)\n{\n    result = in * 0.5;\n}\n",
    )
    .unwrap();

    let mut doc = stdlib::standard_library();
    doc.nodedefs.push(
        NodeDef::new("ND_tint_color3", "tint")
            .with_input(PortDef::new("in", "color3").with_value("1.0, 1.0, 1.0"))
            .with_output(PortDef::new("out", "color3")),
    );
    doc.implementations.push(Implementation {
        name: "IM_tint_color3_osl".to_string(),
        nodedef: "ND_tint_color3".to_string(),
        file: Some("mx_tint.osl".to_string()),
        function: Some("mx_tint".to_string()),
        language: "osl".to_string(),
        target: String::new(),
        source: None,
    });
    let mut graph = NodeGraph::new("NG_tint");
    graph.nodes.push(NodeInstance::new("t", "tint", "color3"));
    graph.outputs.push(output("out", "color3", "t"));
    doc.nodegraphs.push(graph);
    let generator = OslShaderGenerator::new().unwrap();

    let err =
        generate_from_node_graph(&generator, "NG_tint", doc.nodegraph("NG_tint").unwrap(), &doc, &mut GenContext::default())
            .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("mx_tint.osl"));

    let mut search_path = FileSearchPath::new();
    search_path.append(dir.path());
    let mut ctx = GenContext::default().with_search_path(search_path);
    let shader = generate_from_node_graph(&generator, "NG_tint", doc.nodegraph("NG_tint").unwrap(), &doc, &mut ctx).unwrap();
    let code = shader.source_code();
    let definition = position(code, "void mx_tint(color in, output color result)");
    let call = position(code, "mx_tint(color(1.0, 1.0, 1.0), t_out);");
    assert!(definition < call);
}

fn texture_graph(default: &str) -> NodeGraph {
    let mut graph = NodeGraph::new("NG_tex");
    graph.nodes.push(
        NodeInstance::new("img", "image", "color3")
            .with_input(InputBinding::value("file", "filename", "wood.png"))
            .with_input(InputBinding::value("default", "color3", default)),
    );
    graph.outputs.push(output("out", "color3", "img"));
    graph
}

#[test]
fn test_fragment_names_follow_content() {
    let generator = FragmentGenerator::new().unwrap();
    let fragment = |default: &str| {
        let doc = library_with(vec![texture_graph(default)]);
        generator
            .generate_from_node_graph("NG_tex", doc.nodegraph("NG_tex").unwrap(), &doc, &mut GenContext::default())
            .unwrap()
    };

    let first = fragment("0.0, 0.0, 0.0");
    let again = fragment("0.0, 0.0, 0.0");
    let changed = fragment("0.5, 0.5, 0.5");

    assert!(first.name.starts_with("NG_tex__"));
    assert_eq!(first.name, again.name);
    assert_eq!(first.text, again.text);
    assert_ne!(first.name, changed.name);
    assert!(!first.text.contains("$fragmentName"));
    assert!(first.text.contains(&format!("name=\"{}\"", first.name)));
    assert!(!first.shader.source_code().contains("$fragmentName"));
    assert!(first.shader.source_code().contains(&format!("void {}(", first.name)));
    assert_eq!(first.shader.name(), first.name);
}

#[test]
fn test_fragment_maps_samplers_to_textures() {
    let doc = library_with(vec![texture_graph("0.0, 0.0, 0.0")]);
    let generator = FragmentGenerator::new().unwrap();

    let fragment = generator
        .generate_from_node_graph("NG_tex", doc.nodegraph("NG_tex").unwrap(), &doc, &mut GenContext::default())
        .unwrap();
    assert_eq!(
        fragment.path_map.get("NG_tex/img/file").map(String::as_str),
        Some("img_file_texture")
    );
    assert!(fragment.text.contains("<texture2 name=\"img_file_texture\" />"));
    assert!(fragment.text.contains("<sampler name=\"img_file_sampler\" />"));
    assert!(fragment.shader.source_code().contains("uniform sampler2D img_file_sampler;"));
    assert!(!fragment.path_map.values().any(|v| v == "u_numActiveLightSources"));
}

#[test]
fn test_switch_emits_branch_chain() {
    let mut graph = NodeGraph::new("NG_switch");
    graph.nodes.push(
        NodeInstance::new("a", "add", "float")
            .with_input(InputBinding::value("in1", "float", "1.0"))
            .with_input(InputBinding::value("in2", "float", "2.0")),
    );
    graph.nodes.push(
        NodeInstance::new("b", "multiply", "float")
            .with_input(InputBinding::value("in1", "float", "3.0"))
            .with_input(InputBinding::value("in2", "float", "4.0")),
    );
    graph.nodes.push(
        NodeInstance::new("s", "switch", "float")
            .with_input(InputBinding::node("in1", "float", "a"))
            .with_input(InputBinding::node("in2", "float", "b"))
            .with_input(InputBinding::value("which", "float", "1.5")),
    );
    graph.outputs.push(output("out", "float", "s"));
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let shader = generate_from_node_graph(
        &generator,
        "NG_switch",
        doc.nodegraph("NG_switch").unwrap(),
        &doc,
        &mut GenContext::default(),
    )
    .unwrap();
    let code = shader.source_code();

    let first = position(code, "if (1.5 < 1.0)");
    let a = position(code, "a_out = 1.0 + 2.0;");
    let second = position(code, "else if (1.5 < 2.0)");
    let b = position(code, "b_out = 3.0 * 4.0;");
    assert!(first < a && a < second && second < b);
    assert!(code.contains("else if (1.5 < 4.0)"));
    assert!(!code.contains("else if (1.5 < 5.0)"));
}

#[test]
fn test_blur_resamples_file_texture() {
    let mut graph = texture_graph("0.0, 0.0, 0.0");
    graph.name = "NG_blur".to_string();
    graph.nodes.push(
        NodeInstance::new("b", "blur", "color3")
            .with_input(InputBinding::node("in", "color3", "img"))
            .with_input(InputBinding::value("size", "float", "0.01"))
            .with_input(InputBinding::value("filtertype", "string", "gaussian")),
    );
    graph.outputs = vec![output("out", "color3", "b")];
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let shader =
        generate_from_node_graph(&generator, "NG_blur", doc.nodegraph("NG_blur").unwrap(), &doc, &mut GenContext::default())
            .unwrap();
    let code = shader.source_code();

    assert!(code.contains("b_out_texcoord = vector2(0.0, 0.0);"));
    assert!(code.contains("color b_out_samples[9] = {b_out_sample0, b_out_sample1,"));
    assert!(code.contains("float b_out_weights[9] = {0.0625, 0.125, 0.0625,"));
    assert!(code.contains("color b_out = b_out_samples[0] * b_out_weights[0] + b_out_samples[1] * b_out_weights[1]"));
    // One definition, the image's own call and nine taps
    assert_eq!(code.matches("mx_image_color3(").count(), 11);
}

#[test]
fn test_blur_without_texture_passes_through() {
    let mut graph = NodeGraph::new("NG_soft");
    graph.nodes.push(
        NodeInstance::new("b", "blur", "float")
            .with_input(InputBinding::value("in", "float", "0.5"))
            .with_input(InputBinding::value("size", "float", "0.01")),
    );
    graph.outputs.push(output("out", "float", "b"));
    let doc = library_with(vec![graph]);

    let generator = OslShaderGenerator::new().unwrap();
    let shader =
        generate_from_node_graph(&generator, "NG_soft", doc.nodegraph("NG_soft").unwrap(), &doc, &mut GenContext::default())
            .unwrap();
    assert!(shader.source_code().contains("float b_out = 0.5;"));
    assert!(!shader.source_code().contains("b_out_samples"));
}
