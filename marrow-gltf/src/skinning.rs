use std::collections::HashMap;

use renderer::SkinnedVertex;

use crate::{BoneRecord, ImportError};

/// Maps per-mesh bone weight lists onto fixed per-vertex influence slots.
///
/// Slots fill left to right in first-seen order and are never overwritten;
/// influences past the fourth are dropped. The weight vector holds the
/// broadcast scalar of the most recent contributing bone, copied raw — no
/// normalization happens here. An unresolved bone name aborts the import.
pub fn apply_bone_weights(
    vertices: &mut [SkinnedVertex],
    bones: &[BoneRecord],
    joint_indices: &HashMap<&str, usize>,
) -> Result<(), ImportError> {
    let count = vertices.len();

    for bone in bones {
        let joint = *joint_indices
            .get(bone.name.as_str())
            .ok_or_else(|| ImportError::UnknownBone(bone.name.clone()))?;

        for entry in &bone.weights {
            let vertex =
                vertices
                    .get_mut(entry.vertex as usize)
                    .ok_or_else(|| ImportError::BadVertexRef {
                        bone: bone.name.clone(),
                        vertex: entry.vertex,
                        count,
                    })?;

            vertex.joint_weights = [entry.weight; 3];

            let slot = vertex
                .joint_indices
                .iter_mut()
                .find(|slot| **slot == SkinnedVertex::NO_JOINT);
            match slot {
                Some(slot) => *slot = joint as i32,
                None => log::trace!(
                    "vertex {} already has 4 influences, bone {:?} dropped",
                    entry.vertex,
                    bone.name
                ),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VertexWeight;

    fn bone(name: &str, weights: &[(u32, f32)]) -> BoneRecord {
        BoneRecord {
            name: name.into(),
            weights: weights
                .iter()
                .map(|&(vertex, weight)| VertexWeight { vertex, weight })
                .collect(),
        }
    }

    #[test]
    fn resolved_bone_fills_the_first_free_slot() {
        let mut vertices = vec![SkinnedVertex::default(); 1];
        let joints = HashMap::from([("Root", 0), ("Hips", 1), ("Spine", 2)]);

        apply_bone_weights(&mut vertices, &[bone("Spine", &[(0, 1.0)])], &joints).unwrap();

        assert_eq!(vertices[0].joint_indices, [2, -1, -1, -1]);
        assert_eq!(vertices[0].joint_weights, [1.0; 3]);
    }

    #[test]
    fn fifth_influence_is_dropped_not_overwritten() {
        let mut vertices = vec![SkinnedVertex::default(); 1];
        let names = ["a", "b", "c", "d", "e"];
        let joints: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, &name)| (name, i)).collect();
        let bones: Vec<BoneRecord> = names.iter().map(|&name| bone(name, &[(0, 0.2)])).collect();

        apply_bone_weights(&mut vertices, &bones, &joints).unwrap();

        assert_eq!(vertices[0].joint_indices, [0, 1, 2, 3]);
    }

    #[test]
    fn unique_names_resolve_to_distinct_joints() {
        let mut vertices = vec![SkinnedVertex::default(); 4];
        let names = ["hips", "spine", "arm.L", "arm.R"];
        let joints: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, &name)| (name, i)).collect();
        let bones: Vec<BoneRecord> = names
            .iter()
            .enumerate()
            .map(|(i, &name)| bone(name, &[(i as u32, 1.0)]))
            .collect();

        apply_bone_weights(&mut vertices, &bones, &joints).unwrap();

        let mut resolved: Vec<i32> = vertices
            .iter()
            .map(|vertex| vertex.joint_indices[0])
            .collect();
        assert!(resolved
            .iter()
            .all(|&index| index != SkinnedVertex::NO_JOINT));
        resolved.sort_unstable();
        resolved.dedup();
        assert_eq!(resolved.len(), 4);
    }

    #[test]
    fn unknown_bone_is_an_error() {
        let mut vertices = vec![SkinnedVertex::default(); 1];
        let joints = HashMap::from([("Root", 0)]);

        let result = apply_bone_weights(&mut vertices, &[bone("Phantom", &[(0, 1.0)])], &joints);
        assert!(matches!(result, Err(ImportError::UnknownBone(name)) if name == "Phantom"));
    }

    #[test]
    fn out_of_range_weight_is_an_error() {
        let mut vertices = vec![SkinnedVertex::default(); 2];
        let joints = HashMap::from([("Root", 0)]);

        let result = apply_bone_weights(&mut vertices, &[bone("Root", &[(5, 1.0)])], &joints);
        assert!(matches!(
            result,
            Err(ImportError::BadVertexRef { vertex: 5, .. })
        ));
    }
}
