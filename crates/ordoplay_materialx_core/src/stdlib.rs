// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard node library.
//!
//! Node definitions and implementations for the built-in node
//! categories: math operators, constants, conditionals, blur, image
//! lookup and basic shading. Nodes implemented procedurally by a
//! generator (constant, dot, conditionals, switch, blur) have nodedefs
//! here but no source implementation.

use crate::document::{
    Document, GraphOutput, Implementation, InputBinding, NodeDef, NodeGraph, NodeInstance, PortDef,
};

/// Languages the library carries source implementations for
pub const LANGUAGES: [&str; 3] = ["osl", "mdl", "glsl"];

/// Types the math and procedural nodes are defined for
const VALUE_TYPES: [&str; 3] = ["float", "color3", "vector3"];

/// Create the standard library document
pub fn standard_library() -> Document {
    let mut doc = Document::new("stdlib");

    add_math_nodes(&mut doc);
    add_procedural_nodes(&mut doc);
    add_texture_nodes(&mut doc);
    add_shading_nodes(&mut doc);
    add_compound_nodes(&mut doc);

    doc
}

fn splat(type_name: &str, component: &str) -> String {
    let count = match type_name {
        "vector2" | "color2" => 2,
        "vector3" | "color3" => 3,
        "vector4" | "color4" => 4,
        _ => 1,
    };
    vec![component; count].join(", ")
}

fn inline(doc: &mut Document, nodedef: &str, language: &str, expression: &str) {
    doc.implementations.push(Implementation {
        name: format!("IM_{}_{language}", nodedef.trim_start_matches("ND_")),
        nodedef: nodedef.to_string(),
        file: Some(format!("mx_{}.inline", nodedef.trim_start_matches("ND_"))),
        function: None,
        language: language.to_string(),
        target: String::new(),
        source: Some(expression.to_string()),
    });
}

fn source(doc: &mut Document, nodedef: &str, language: &str, function: &str, extension: &str, text: &str) {
    doc.implementations.push(Implementation {
        name: format!("IM_{}_{language}", nodedef.trim_start_matches("ND_")),
        nodedef: nodedef.to_string(),
        file: Some(format!("{function}.{extension}")),
        function: Some(function.to_string()),
        language: language.to_string(),
        target: String::new(),
        source: Some(text.to_string()),
    });
}

// ============================================================================
// Math
// ============================================================================

fn add_math_nodes(doc: &mut Document) {
    let operators = [
        ("add", "+", "0.0"),
        ("subtract", "-", "0.0"),
        ("multiply", "*", "1.0"),
        ("divide", "/", "1.0"),
    ];

    for type_name in VALUE_TYPES {
        for (category, operator, identity) in operators {
            let name = format!("ND_{category}_{type_name}");
            doc.nodedefs.push(
                NodeDef::new(&name, category)
                    .with_input(PortDef::new("in1", type_name).with_value(splat(type_name, "0.0")))
                    .with_input(PortDef::new("in2", type_name).with_value(splat(type_name, identity)))
                    .with_output(PortDef::new("out", type_name)),
            );
            for language in LANGUAGES {
                inline(doc, &name, language, &format!("{{{{in1}}}} {operator} {{{{in2}}}}"));
            }
        }

        let name = format!("ND_mix_{type_name}");
        doc.nodedefs.push(
            NodeDef::new(&name, "mix")
                .with_input(PortDef::new("fg", type_name).with_value(splat(type_name, "0.0")))
                .with_input(PortDef::new("bg", type_name).with_value(splat(type_name, "0.0")))
                .with_input(PortDef::new("mix", "float").with_value("0.0"))
                .with_output(PortDef::new("out", type_name)),
        );
        inline(doc, &name, "osl", "mix({{bg}}, {{fg}}, {{mix}})");
        inline(doc, &name, "glsl", "mix({{bg}}, {{fg}}, {{mix}})");
        inline(doc, &name, "mdl", "math::lerp({{bg}}, {{fg}}, {{mix}})");
    }

    // Color scaled by a float
    let name = "ND_multiply_color3FA";
    doc.nodedefs.push(
        NodeDef::new(name, "multiply")
            .with_input(PortDef::new("in1", "color3").with_value("0.0, 0.0, 0.0"))
            .with_input(PortDef::new("in2", "float").with_value("1.0"))
            .with_output(PortDef::new("out", "color3")),
    );
    for language in LANGUAGES {
        inline(doc, name, language, "{{in1}} * {{in2}}");
    }
}

// ============================================================================
// Procedural nodes
// ============================================================================

fn add_procedural_nodes(doc: &mut Document) {
    for type_name in ["float", "color3", "color4", "vector2", "vector3", "matrix33", "floatarray"] {
        let mut value = PortDef::new("value", type_name);
        if type_name != "floatarray" && type_name != "matrix33" {
            value = value.with_value(splat(type_name, "0.0"));
        }
        doc.nodedefs.push(
            NodeDef::new(format!("ND_constant_{type_name}"), "constant")
                .with_input(value)
                .with_output(PortDef::new("out", type_name)),
        );
    }

    for type_name in ["float", "color3", "vector3", "filename"] {
        doc.nodedefs.push(
            NodeDef::new(format!("ND_dot_{type_name}"), "dot")
                .with_input(PortDef::new("in", type_name))
                .with_output(PortDef::new("out", type_name)),
        );
    }

    for type_name in VALUE_TYPES {
        for category in ["ifgreater", "ifgreatereq", "ifequal"] {
            doc.nodedefs.push(
                NodeDef::new(format!("ND_{category}_{type_name}"), category)
                    .with_input(PortDef::new("value1", "float").with_value("1.0"))
                    .with_input(PortDef::new("value2", "float").with_value("0.0"))
                    .with_input(PortDef::new("in1", type_name).with_value(splat(type_name, "0.0")))
                    .with_input(PortDef::new("in2", type_name).with_value(splat(type_name, "0.0")))
                    .with_output(PortDef::new("out", type_name)),
            );
        }

        let mut switch = NodeDef::new(format!("ND_switch_{type_name}"), "switch");
        for i in 1..=5 {
            switch = switch.with_input(PortDef::new(format!("in{i}"), type_name).with_value(splat(type_name, "0.0")));
        }
        doc.nodedefs.push(
            switch
                .with_input(PortDef::new("which", "float").with_value("0.0"))
                .with_output(PortDef::new("out", type_name)),
        );

        doc.nodedefs.push(
            NodeDef::new(format!("ND_blur_{type_name}"), "blur")
                .with_input(PortDef::new("in", type_name).with_value(splat(type_name, "0.0")))
                .with_input(PortDef::new("size", "float").with_value("0.0"))
                .with_input(PortDef::new("filtertype", "string").with_value("box").uniform())
                .with_output(PortDef::new("out", type_name)),
        );
    }
}

// ============================================================================
// Textures
// ============================================================================

const IMAGE_OSL: &str = r#"void mx_image_color3(string file, color default_value, vector2 texcoord, output color result)
{
    result = texture(file, texcoord.x, texcoord.y, "missingcolor", default_value);
}
"#;

const IMAGE_MDL: &str = r#"color mx_image_color3(uniform texture_2d file, color default_value, float2 texcoord)
{
    return tex::texture_isvalid(file) ? color(tex::lookup_float3(file, texcoord)) : default_value;
}
"#;

const IMAGE_GLSL: &str = r#"void mx_image_color3(sampler2D tex_sampler, vec3 default_value, vec2 texcoord, out vec3 result)
{
    result = texture(tex_sampler, texcoord).rgb;
}
"#;

fn add_texture_nodes(doc: &mut Document) {
    let name = "ND_image_color3";
    doc.nodedefs.push(
        NodeDef::new(name, "image")
            .with_input(PortDef::new("file", "filename").with_value("").uniform())
            .with_input(PortDef::new("default", "color3").with_value("0.0, 0.0, 0.0"))
            .with_input(PortDef::new("texcoord", "vector2").with_value("0.0, 0.0"))
            .with_output(PortDef::new("out", "color3")),
    );
    source(doc, name, "osl", "mx_image_color3", "osl", IMAGE_OSL);
    source(doc, name, "mdl", "mx_image_color3", "mdl", IMAGE_MDL);
    source(doc, name, "glsl", "mx_image_color3", "glsl", IMAGE_GLSL);
}

// ============================================================================
// Shading
// ============================================================================

const DIFFUSE_OSL: &str = r#"void mx_diffuse_bsdf(float weight, color reflectance, float roughness, vector N, output closure color result)
{
    result = weight * reflectance * oren_nayar(N, roughness);
}
"#;

const DIFFUSE_MDL: &str = r#"bsdf mx_diffuse_bsdf(float weight, color reflectance, float roughness, float3 N)
{
    return df::diffuse_reflection_bsdf(tint: reflectance * weight, roughness: roughness);
}
"#;

const SURFACE_OSL: &str = r#"void mx_surface(closure color bsdf, closure color edf, float opacity, output closure color result)
{
    result = (bsdf + edf) * opacity + transparent() * (1.0 - opacity);
}
"#;

const SURFACE_MDL: &str = r#"material mx_surface(bsdf bsdf_in, edf edf_in, float opacity)
= material(
    surface: material_surface(scattering: bsdf_in, emission: material_emission(emission: edf_in)),
    geometry: material_geometry(cutout_opacity: opacity)
);
"#;

fn add_shading_nodes(doc: &mut Document) {
    let name = "ND_diffuse_bsdf";
    doc.nodedefs.push(
        NodeDef::new(name, "diffuse_bsdf")
            .with_input(PortDef::new("weight", "float").with_value("1.0"))
            .with_input(PortDef::new("color", "color3").with_value("0.18, 0.18, 0.18"))
            .with_input(PortDef::new("roughness", "float").with_value("0.0"))
            .with_input(PortDef::new("normal", "vector3").with_value("0.0, 0.0, 1.0"))
            .with_output(PortDef::new("out", "BSDF")),
    );
    source(doc, name, "osl", "mx_diffuse_bsdf", "osl", DIFFUSE_OSL);
    source(doc, name, "mdl", "mx_diffuse_bsdf", "mdl", DIFFUSE_MDL);

    let name = "ND_surface";
    doc.nodedefs.push(
        NodeDef::new(name, "surface")
            .with_input(PortDef::new("bsdf", "BSDF"))
            .with_input(PortDef::new("edf", "EDF"))
            .with_input(PortDef::new("opacity", "float").with_value("1.0"))
            .with_output(PortDef::new("out", "surfaceshader")),
    );
    source(doc, name, "osl", "mx_surface", "osl", SURFACE_OSL);
    source(doc, name, "mdl", "mx_surface", "mdl", SURFACE_MDL);
}

// ============================================================================
// Compounds
// ============================================================================

fn add_compound_nodes(doc: &mut Document) {
    doc.nodedefs.push(
        NodeDef::new("ND_scale_color3", "scale")
            .with_input(PortDef::new("in", "color3").with_value("0.0, 0.0, 0.0"))
            .with_input(PortDef::new("amount", "float").with_value("1.0"))
            .with_output(PortDef::new("out", "color3")),
    );

    let mut multiply = NodeInstance::new("scaled", "multiply", "color3")
        .with_input(InputBinding::interface("in1", "color3", "in"))
        .with_input(InputBinding::interface("in2", "float", "amount"));
    multiply.nodedef = Some("ND_multiply_color3FA".to_string());

    let mut graph = NodeGraph::new("NG_scale_color3");
    graph.nodedef = Some("ND_scale_color3".to_string());
    graph.nodes.push(multiply);
    graph.outputs.push(GraphOutput {
        name: "out".to_string(),
        type_name: "color3".to_string(),
        nodename: "scaled".to_string(),
        output: None,
        channels: None,
    });
    doc.nodegraphs.push(graph);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_nodes_have_inline_implementations() {
        let lib = standard_library();
        for language in LANGUAGES {
            let im = lib
                .source_implementation("ND_multiply_float", language, "")
                .unwrap();
            assert!(im.is_inline());
            assert_eq!(im.source.as_deref(), Some("{{in1}} * {{in2}}"));
        }
    }

    #[test]
    fn test_nodedef_names_are_unique() {
        let lib = standard_library();
        let mut names: Vec<&str> = lib.nodedefs.iter().map(|nd| nd.name.as_str()).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_defaults_parse() {
        let lib = standard_library();
        for nodedef in &lib.nodedefs {
            for input in &nodedef.inputs {
                assert!(
                    input.default_value().is_ok(),
                    "{}.{} has an invalid default",
                    nodedef.name,
                    input.name
                );
            }
        }
    }

    #[test]
    fn test_compound_is_linked_to_nodedef() {
        let lib = standard_library();
        let graph = lib.nodegraph_for_nodedef("ND_scale_color3").unwrap();
        assert_eq!(graph.name, "NG_scale_color3");
        assert!(lib.source_implementation("ND_scale_color3", "osl", "").is_none());
    }

    #[test]
    fn test_closures_have_no_glsl_implementation() {
        let lib = standard_library();
        assert!(lib.source_implementation("ND_diffuse_bsdf", "glsl", "").is_none());
        assert!(lib.source_implementation("ND_diffuse_bsdf", "mdl", "").is_some());
    }
}
