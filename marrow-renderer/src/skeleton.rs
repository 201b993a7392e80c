use std::collections::VecDeque;

/// Parent index carried by a root joint.
pub const NO_PARENT: i32 = -1;

/// One node of a rigid skeletal hierarchy.
///
/// `parent_index` refers into the owning [`Skeleton`]'s storage; parents are
/// always stored before their children.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub inv_bind_pose: glam::Mat4,
    pub parent_index: i32,
}

/// Array-based joint tree for one rigid hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
}

impl Skeleton {
    pub const INITIAL_CAPACITY: usize = 4;

    pub fn new() -> Self {
        Self {
            joints: Vec::with_capacity(Self::INITIAL_CAPACITY),
        }
    }

    /// Appends a joint, growing storage as needed.
    ///
    /// Callers inserting in breadth-first order keep the parent-first
    /// invariant for free; anything else must call
    /// [`Skeleton::reorder_parent_first`] once after the last insertion.
    /// Reordering renumbers storage, so joint indices cached across it are
    /// invalid.
    pub fn add_joint(&mut self, joint: Joint) {
        self.joints.push(joint);
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Storage index of the joint with this name. The last match wins when
    /// names collide.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().rposition(|joint| joint.name == name)
    }

    /// Whether every joint's parent is stored at a lower index.
    pub fn is_parent_ordered(&self) -> bool {
        self.joints
            .iter()
            .enumerate()
            .all(|(index, joint)| joint.parent_index < index as i32)
    }

    /// Re-establishes parent-first storage order after out-of-order bulk
    /// insertion, remapping every `parent_index` to the new numbering.
    pub fn reorder_parent_first(&mut self) {
        if self.is_parent_ordered() {
            return;
        }

        let count = self.joints.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut queue = VecDeque::new();

        for (index, joint) in self.joints.iter().enumerate() {
            let parent = joint.parent_index;
            if (0..count as i32).contains(&parent) && parent != index as i32 {
                children[parent as usize].push(index);
            } else {
                queue.push_back(index);
            }
        }

        let mut order = Vec::with_capacity(count);
        while let Some(old) = queue.pop_front() {
            order.push(old);
            for &child in &children[old] {
                queue.push_back(child);
            }
        }

        if order.len() != count {
            log::warn!("skeleton contains a parent cycle, reorder skipped");
            return;
        }

        let mut remap = vec![NO_PARENT; count];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new as i32;
        }

        let mut slots: Vec<Option<Joint>> = std::mem::take(&mut self.joints)
            .into_iter()
            .map(Some)
            .collect();

        self.joints = order
            .iter()
            .filter_map(|&old| slots[old].take())
            .map(|mut joint| {
                if (0..count as i32).contains(&joint.parent_index) {
                    joint.parent_index = remap[joint.parent_index as usize];
                }
                joint
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(name: &str, parent_index: i32) -> Joint {
        Joint {
            name: name.into(),
            inv_bind_pose: glam::Mat4::IDENTITY,
            parent_index,
        }
    }

    #[test]
    fn breadth_first_inserts_keep_parents_before_children() {
        let mut skeleton = Skeleton::new();
        skeleton.add_joint(joint("root", NO_PARENT));
        skeleton.add_joint(joint("hips", 0));
        skeleton.add_joint(joint("chest", 0));
        skeleton.add_joint(joint("head", 2));

        assert_eq!(skeleton.joint_count(), 4);
        assert_eq!(skeleton.joints()[0].parent_index, NO_PARENT);
        assert_eq!(skeleton.joints()[1].parent_index, 0);
        assert_eq!(skeleton.joints()[2].parent_index, 0);
        assert_eq!(skeleton.joints()[3].parent_index, 2);
        assert!(skeleton.is_parent_ordered());
    }

    #[test]
    fn deep_tree_never_references_a_later_joint() {
        let mut skeleton = Skeleton::new();
        skeleton.add_joint(joint("root", NO_PARENT));

        // Two children per node, three levels below the root.
        let mut parents = vec![0i32];
        let mut next = 1;
        for _ in 0..3 {
            let mut level = Vec::new();
            for &parent in &parents {
                for _ in 0..2 {
                    skeleton.add_joint(joint(&format!("joint{next}"), parent));
                    level.push(next);
                    next += 1;
                }
            }
            parents = level;
        }

        assert_eq!(skeleton.joint_count(), 15);
        for (index, joint) in skeleton.joints().iter().enumerate() {
            assert!(joint.parent_index < index as i32);
        }
    }

    #[test]
    fn growth_preserves_existing_joints() {
        let mut skeleton = Skeleton::new();
        for i in 0..10 {
            skeleton.add_joint(joint(&format!("bone{i}"), i as i32 - 1));
        }

        assert!(skeleton.joint_count() > Skeleton::INITIAL_CAPACITY);
        for (index, joint) in skeleton.joints().iter().enumerate() {
            assert_eq!(joint.name, format!("bone{index}"));
            assert_eq!(joint.parent_index, index as i32 - 1);
        }
    }

    #[test]
    fn reorder_restores_parent_first_order() {
        let mut skeleton = Skeleton::new();
        skeleton.add_joint(joint("hand", 2));
        skeleton.add_joint(joint("root", NO_PARENT));
        skeleton.add_joint(joint("arm", 1));

        assert!(!skeleton.is_parent_ordered());
        skeleton.reorder_parent_first();
        assert!(skeleton.is_parent_ordered());

        let root = skeleton.index_of("root").unwrap();
        let arm = skeleton.index_of("arm").unwrap();
        let hand = skeleton.index_of("hand").unwrap();
        assert_eq!(skeleton.joints()[root].parent_index, NO_PARENT);
        assert_eq!(skeleton.joints()[arm].parent_index, root as i32);
        assert_eq!(skeleton.joints()[hand].parent_index, arm as i32);
    }

    #[test]
    fn index_of_prefers_the_last_duplicate() {
        let mut skeleton = Skeleton::new();
        skeleton.add_joint(joint("root", NO_PARENT));
        skeleton.add_joint(joint("twin", 0));
        skeleton.add_joint(joint("twin", 0));

        assert_eq!(skeleton.index_of("twin"), Some(2));
        assert_eq!(skeleton.index_of("missing"), None);
    }
}
